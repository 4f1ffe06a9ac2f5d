//! Problem-file I/O (§6): a minimal JSON schema for describing a [`Problem`],
//! parsed with `serde_json` the same way `Settings`/`Results`/the trace file
//! are. File-format I/O for instances is an external-collaborator concern
//! (§1) — this is the one concrete format the CLI ships with, not a
//! stand-in for a format like MPS or SIF.

use serde::{Deserialize, Serialize};

use crate::error::{EshError, EshResult};
use crate::expression::Expr;
use crate::problem::{Objective, Problem, Sense, VariableKind};

#[derive(Debug, Serialize, Deserialize)]
struct VariableFile {
    name: String,
    kind: VariableKind,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum ObjectiveFile {
    Linear { coefficients: Vec<(usize, f64)>, constant: f64 },
    Quadratic { linear: Vec<(usize, f64)>, quadratic: Vec<(usize, usize, f64)>, constant: f64 },
    Nonlinear { expr: Expr },
}

#[derive(Debug, Serialize, Deserialize)]
struct LinearConstraintFile {
    coefficients: Vec<(usize, f64)>,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuadraticConstraintFile {
    linear: Vec<(usize, f64)>,
    quadratic: Vec<(usize, usize, f64)>,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct NonlinearConstraintFile {
    expr: Expr,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProblemFile {
    sense: Sense,
    variables: Vec<VariableFile>,
    objective: ObjectiveFile,
    #[serde(default)]
    linear_constraints: Vec<LinearConstraintFile>,
    #[serde(default)]
    quadratic_constraints: Vec<QuadraticConstraintFile>,
    #[serde(default)]
    nonlinear_constraints: Vec<NonlinearConstraintFile>,
}

/// Parses a JSON problem description into a [`Problem`].
pub fn parse_problem(json: &str) -> EshResult<Problem> {
    let file: ProblemFile = serde_json::from_str(json).map_err(|e| EshError::input(format!("problem file: {e}")))?;
    let n_vars = file.variables.len();

    let mut problem = Problem::new();
    for v in &file.variables {
        problem.add_variable(v.name.clone(), v.kind, v.lower, v.upper)?;
    }

    let objective = match file.objective {
        ObjectiveFile::Linear { coefficients, constant } => Objective::Linear { coefficients, constant },
        ObjectiveFile::Quadratic { linear, quadratic, constant } => Objective::Quadratic { linear, quadratic, constant },
        ObjectiveFile::Nonlinear { expr } => Objective::Nonlinear { expr: expr.into_handle(n_vars) },
    };
    problem.set_objective(file.sense, objective);

    for c in file.linear_constraints {
        problem.add_linear_constraint(c.coefficients, c.lower, c.upper)?;
    }
    for c in file.quadratic_constraints {
        problem.add_quadratic_constraint(c.linear, c.quadratic, c.lower, c.upper)?;
    }
    for c in file.nonlinear_constraints {
        problem.add_nonlinear_constraint(c.expr.into_handle(n_vars), c.lower, c.upper)?;
    }

    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_linear_problem() {
        let json = r#"{
            "sense": "Min",
            "variables": [
                {"name": "x", "kind": "Integer", "lower": 0.0, "upper": 10.0},
                {"name": "y", "kind": "Integer", "lower": 0.0, "upper": 10.0}
            ],
            "objective": {"kind": "Linear", "coefficients": [[0, 1.0], [1, 1.0]], "constant": 0.0},
            "linear_constraints": [
                {"coefficients": [[0, 1.0], [1, 1.0]], "lower": 3.0, "upper": 1e300}
            ]
        }"#;
        let problem = parse_problem(json).unwrap();
        assert_eq!(problem.n_vars(), 2);
        assert_eq!(problem.linear_constraints().len(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_problem("not json").is_err());
    }

    #[test]
    fn parses_a_nonlinear_constraint() {
        let json = r#"{
            "sense": "Min",
            "variables": [
                {"name": "x", "kind": "Real", "lower": -10.0, "upper": 10.0},
                {"name": "y", "kind": "Real", "lower": -10.0, "upper": 10.0}
            ],
            "objective": {"kind": "Linear", "coefficients": [[0, 1.0]], "constant": 0.0},
            "nonlinear_constraints": [
                {"expr": {"Add": [{"Pow": [{"Var": 0}, 2]}, {"Pow": [{"Var": 1}, 2]}]}, "lower": -1e300, "upper": 1.0}
            ]
        }"#;
        let problem = parse_problem(json).unwrap();
        assert_eq!(problem.nonlinear_constraints().len(), 1);
    }
}

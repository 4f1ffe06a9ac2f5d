//! File-backed round trip of the §6 problem/options/results JSON formats,
//! exercised against real temporary files rather than in-memory strings.

use std::fs;
use std::io::Write;

use eshmip::loader;
use eshmip::settings::Settings;
use eshmip::solve;
use tempfile::NamedTempFile;

const PROBLEM_JSON: &str = r#"{
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

#[test]
fn problem_file_loads_from_disk_and_solves() {
    let mut file = NamedTempFile::new().expect("create temp problem file");
    file.write_all(PROBLEM_JSON.as_bytes()).expect("write problem file");

    let contents = fs::read_to_string(file.path()).expect("read problem file back");
    let problem = loader::parse_problem(&contents).expect("parse problem file");

    let results = solve(problem, Settings::default()).unwrap();
    assert!((results.best_primal_value - 3.0).abs() < 1e-4);
}

#[test]
fn results_json_round_trips_through_a_temp_file() {
    let mut file = NamedTempFile::new().expect("create temp problem file");
    file.write_all(PROBLEM_JSON.as_bytes()).expect("write problem file");
    let problem = loader::parse_problem(&fs::read_to_string(file.path()).unwrap()).unwrap();

    let results = solve(problem, Settings::default()).unwrap();
    let results_file = NamedTempFile::new().expect("create temp results file");
    fs::write(results_file.path(), serde_json::to_string_pretty(&results).unwrap()).expect("write results file");

    let reloaded: eshmip::Results = serde_json::from_str(&fs::read_to_string(results_file.path()).unwrap()).unwrap();
    assert_eq!(reloaded.termination_reason, results.termination_reason);
    assert_eq!(reloaded.best_primal_value, results.best_primal_value);
}

//! Minimal CLI (§6): `eshmip <problem-file> [options-file] [results-file] [trace-file]`.
//!
//! Exits 0 on normal termination regardless of optimality status — the
//! results file carries the termination reason. Exits nonzero on
//! file-not-found or unparsable input.

use std::env;
use std::fs;

use eshmip::{loader, solve, Settings};

fn read_file(path: &str, what: &str) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("cannot read {what} '{path}': {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 5 {
        eprintln!("usage: {} <problem-file> [options-file] [results-file] [trace-file]", args[0]);
        std::process::exit(1);
    }

    let problem_path = &args[1];
    let options_path = args.get(2);
    let results_path = args.get(3).map(String::as_str).unwrap_or("results.json");
    let trace_path = args.get(4);

    let problem_json = read_file(problem_path, "problem file");
    let problem = match loader::parse_problem(&problem_json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let settings = match options_path {
        Some(path) => {
            let json = read_file(path, "options file");
            match serde_json::from_str::<Settings>(&json) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("cannot parse options file '{path}': {e}");
                    std::process::exit(1);
                }
            }
        }
        None => Settings::default(),
    };

    let results = match solve(problem, settings) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("solve failed: {e}");
            std::process::exit(1);
        }
    };

    let results_json = serde_json::to_string_pretty(&results).expect("results always serialize");
    if let Err(e) = fs::write(results_path, &results_json) {
        eprintln!("cannot write results file '{results_path}': {e}");
        std::process::exit(1);
    }

    if let Some(trace_path) = trace_path {
        let trace_json = serde_json::to_string_pretty(&results.iterations).expect("iterations always serialize");
        if let Err(e) = fs::write(trace_path, &trace_json) {
            eprintln!("cannot write trace file '{trace_path}': {e}");
            std::process::exit(1);
        }
    }

    if let Some(reason) = results.termination_reason {
        println!("terminated: {reason}");
    }
    std::process::exit(0);
}

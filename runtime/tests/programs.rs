//! The sample programs shipped in `programs/` behave as documented.

use blockflow_core::{Program, Value};
use blockflow_runtime::{Engine, ExecutorConfig, RunError};
use std::path::PathBuf;

fn sample(name: &str) -> Engine {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../programs")
        .join(name);
    let program = Program::from_path(&path).expect("sample program should load");
    Engine::from_program(&program, Default::default()).expect("sample program should build")
}

fn config() -> ExecutorConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../programs/blockflow.toml");
    ExecutorConfig::from_path(path).expect("sample config should parse")
}

#[test]
fn count_to_three() {
    let report = sample("count_to_three.json").run(config()).unwrap();
    let env = report.final_environment().unwrap();
    assert_eq!(env.get("n"), Some(&Value::from(3)));
    assert_eq!(env.get("finished"), Some(&Value::Bool(true)));
}

#[test]
fn fork() {
    let report = sample("fork.json").run(config()).unwrap();
    let xs: Vec<String> = report
        .completed()
        .map(|env| env.get("x").unwrap().to_string())
        .collect();
    assert_eq!(xs, vec!["5", "20"]);
}

#[test]
fn type_conflict() {
    let err = sample("type_conflict.json").run(config()).unwrap_err();
    assert_eq!(err.kind(), "type_conflict");
}

#[test]
fn spin_needs_a_budget() {
    let err = sample("spin.json")
        .run(config().with_step_budget(25))
        .unwrap_err();
    assert!(matches!(err, RunError::StepBudgetExceeded { budget: 25, .. }));
}

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use choice_cli::nodes::NodeSpec;
use choice_cli::tree::DecisionTree;
use choice_cli::tree_file::{load_tree_file, TreeFile};
use choice_cli::ChoiceError;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[test]
fn test_oil_file_matches_programmatic_tree() {
    let bag = load_tree_file(demo("oil.json")).unwrap();
    assert_eq!(bag.root_name(), Some("test_decision"));
    assert_eq!(bag.dependent_probabilities().len(), 9);
    assert!(matches!(bag.get("drill_decision"), Some(NodeSpec::Decision { maximize: true, .. })));

    let mut tree = DecisionTree::new(&bag).unwrap();
    tree.evaluate().unwrap();
    let ev = tree.rollback_ev().unwrap();
    assert_abs_diff_eq!(ev, 545.0288, epsilon = 1e-6);
}

#[test]
fn test_minimizing_file_with_outcome_override() {
    let bag = load_tree_file(demo("supply.json")).unwrap();
    let mut tree = DecisionTree::new(&bag).unwrap();
    tree.evaluate().unwrap();
    let cost = tree.rollback_ev().unwrap();
    // local: 120 + 0.6 * 20; overseas: 80 + 34 + 0.6 * 35
    assert_abs_diff_eq!(cost, 132.0, epsilon = 1e-9);
    let overseas = tree.root().successors()[1];
    assert_abs_diff_eq!(tree.nodes()[overseas].ev.unwrap(), 135.0, epsilon = 1e-9);
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(load_tree_file(demo("missing.json")), Err(ChoiceError::IoError(_))));
}

#[test]
fn test_strict_policy_rejects_bad_sum() {
    let json = r#"{"nodes": [
        {"name": "c", "type": "chance", "branches": [
            {"label": "a", "probability": 0.5, "value": 1, "next": "end"},
            {"label": "b", "probability": 0.4, "value": 2, "next": "end"}]},
        {"name": "end", "type": "terminal"}]}"#;
    let err = TreeFile::from_json(json).unwrap().into_bag().unwrap_err();
    assert!(matches!(err, ChoiceError::Validation(_)));
}

#[test]
fn test_unknown_successor_rejected_at_build() {
    let json = r#"{"nodes": [
        {"name": "d", "type": "decision", "branches": [
            {"label": "a", "value": 1, "next": "nowhere"}]}]}"#;
    let bag = TreeFile::from_json(json).unwrap().into_bag().unwrap();
    assert!(matches!(DecisionTree::new(&bag), Err(ChoiceError::Validation(_))));
}

fn args(list: &[&str]) -> Vec<String> {
    std::iter::once("choice").chain(list.iter().copied()).map(String::from).collect()
}

#[test]
fn test_cli_commands_succeed() {
    let path = demo("oil.json").to_string_lossy().into_owned();
    choice_cli::cli::try_run_with_args(args(&[
        "rollback", &path, "--view", "ce", "--utility", "exp", "--risk-tolerance", "2000",
    ]))
    .unwrap();
    choice_cli::cli::try_run_with_args(args(&["risk-profile", &path, "--multiple", "--cumulative"]))
        .unwrap();
    choice_cli::cli::try_run_with_args(args(&["prob-sensitivity", &path, "--var", "test_results"]))
        .unwrap();
}

#[test]
fn test_cli_reports_errors() {
    let path = demo("oil.json").to_string_lossy().into_owned();
    let missing = demo("missing.json").to_string_lossy().into_owned();
    assert!(matches!(
        choice_cli::cli::try_run_with_args(args(&["rollback", &missing])),
        Err(ChoiceError::IoError(_))
    ));
    assert!(matches!(
        choice_cli::cli::try_run_with_args(args(&["rollback", &path, "--view", "median"])),
        Err(ChoiceError::Configuration(_))
    ));
    assert!(choice_cli::cli::try_run_with_args(args(&[
        "risk-profile", &path, "--idx", "9999",
    ]))
    .is_err());
}

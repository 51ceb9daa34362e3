mod common;

use approx::assert_abs_diff_eq;
use choice_cli::risk_profile::risk_profile;

use common::{bid, oil, rolled_back};

#[test]
fn test_bid_profile_at_root() {
    let tree = rolled_back(&bid());
    let profiles = risk_profile(&tree, 0, true).unwrap();
    assert_eq!(profiles.len(), 1);
    let p = &profiles[0];
    assert_eq!(p.label, "EV=65.00");

    // -100, 0, 100, 300
    let values: Vec<f64> = p.rows.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![-100.0, 0.0, 100.0, 300.0]);
    assert_abs_diff_eq!(p.rows[1].probability, 0.35, epsilon = 1e-12);
    assert_abs_diff_eq!(p.rows[3].probability, 0.65 * 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(p.total_probability(), 1.0, epsilon = 1e-12);

    let mean: f64 = p.rows.iter().map(|r| r.value * r.probability).sum();
    assert_abs_diff_eq!(mean, p.ev, epsilon = 1e-9);
}

#[test]
fn test_profile_per_branch() {
    let tree = rolled_back(&bid());
    let profiles = risk_profile(&tree, 0, false).unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].label, "low; EV=65.00");
    assert_eq!(profiles[1].label, "high; EV=45.00");
    assert!(profiles[1].rows.windows(2).all(|w| w[0].value < w[1].value));
}

#[test]
fn test_oil_profile_follows_strategy() {
    let tree = rolled_back(&oil());
    let profiles = risk_profile(&tree, 0, true).unwrap();
    let p = &profiles[0];
    assert_abs_diff_eq!(p.total_probability(), 1.0, epsilon = 1e-9);
    // a dry test ends the venture at the cost of the test
    let stop = p.rows.iter().find(|r| r.value == -55.0).unwrap();
    assert_abs_diff_eq!(stop.probability, 0.38, epsilon = 1e-12);
}

#[test]
fn test_terminal_has_no_branches() {
    let tree = rolled_back(&bid());
    assert!(risk_profile(&tree, 3, false).is_err());
    assert_eq!(risk_profile(&tree, 3, true).unwrap()[0].rows.len(), 1);
}

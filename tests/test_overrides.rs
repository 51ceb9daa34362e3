mod common;

use approx::assert_abs_diff_eq;
use choice_cli::nodes::NodeSpecBag;
use choice_cli::payoff::CumulativePayoff;
use choice_cli::tree::DecisionTree;
use choice_cli::ChoiceError;

use common::{bid, bid_dependent_outcomes, bid_dependent_probabilities, rolled_back};

/// Cost probabilities below `bid = <bid>, competitor_bid = <competitor>`.
fn cost_probs(tree: &DecisionTree, bid: &str, competitor: &str) -> Vec<f64> {
    let bid_node = tree.root()
        .successors()
        .iter()
        .copied()
        .find(|&s| tree.nodes()[s].is_tagged("bid", bid))
        .unwrap();
    let cost_node = tree.nodes()[bid_node]
        .successors()
        .iter()
        .copied()
        .find(|&s| tree.nodes()[s].is_tagged("competitor_bid", competitor))
        .unwrap();
    tree.nodes()[cost_node]
        .successors()
        .iter()
        .map(|&s| tree.nodes()[s].tag_prob().unwrap())
        .collect()
}

#[test]
fn test_dependent_probabilities_match_exact_path() {
    let tree = DecisionTree::new(&bid_dependent_probabilities()).unwrap();
    for bid in ["low", "high"] {
        assert_eq!(cost_probs(&tree, bid, "low"), vec![0.40, 0.40, 0.20]);
        assert_eq!(cost_probs(&tree, bid, "medium"), vec![0.25, 0.50, 0.25]);
        assert_eq!(cost_probs(&tree, bid, "high"), vec![0.10, 0.45, 0.45]);
    }
    // competitor probabilities are untouched
    assert_eq!(tree.nodes()[2].tag_prob(), Some(0.35));
}

#[test]
fn test_partial_override_leaves_other_paths() {
    let mut bag = bid();
    bag.set_probability(0.10, [("competitor_bid", "high"), ("cost", "low")])
        .unwrap();
    bag.set_probability(0.40, [("competitor_bid", "high"), ("cost", "high")])
        .unwrap();
    let tree = DecisionTree::new(&bag).unwrap();
    assert_eq!(cost_probs(&tree, "low", "high"), vec![0.10, 0.50, 0.40]);
    assert_eq!(cost_probs(&tree, "low", "medium"), vec![0.25, 0.50, 0.25]);
}

#[test]
fn test_dependent_probabilities_rollback() {
    let tree = rolled_back(&bid_dependent_probabilities());
    let low = tree.root().successors()[0];
    let high = tree.root().successors()[1];
    assert_abs_diff_eq!(tree.nodes()[low].ev.unwrap(), 54.5, epsilon = 1e-9);
    assert_abs_diff_eq!(tree.nodes()[high].ev.unwrap(), 34.5, epsilon = 1e-9);
    assert_abs_diff_eq!(tree.root().ev.unwrap(), 54.5, epsilon = 1e-9);
}

#[test]
fn test_dependent_outcomes_rollback() {
    let tree = rolled_back(&bid_dependent_outcomes());
    let low = tree.root().successors()[0];
    let high = tree.root().successors()[1];
    assert_abs_diff_eq!(tree.nodes()[low].ev.unwrap(), 56.375, epsilon = 1e-9);
    assert_abs_diff_eq!(tree.nodes()[high].ev.unwrap(), 32.25, epsilon = 1e-9);

    // first terminal: bid low, competitor low, cost low
    assert_eq!(tree.nodes()[3].tag_value(), Some(170.0));
}

#[test]
fn test_later_override_wins() {
    let mut bag = NodeSpecBag::new();
    bag.add_decision("d", [("a", 1.0, "end")], true).unwrap();
    bag.add_terminal("end", CumulativePayoff).unwrap();
    bag.set_outcome(5.0, [("d", "a")]).unwrap();
    bag.set_outcome(7.0, [("d", "a")]).unwrap();
    let tree = rolled_back(&bag);
    assert_eq!(tree.root().ev, Some(7.0));
}

#[test]
fn test_override_validation() {
    let mut bag = bid();
    assert!(matches!(
        bag.set_probability(1.5, [("cost", "low")]),
        Err(ChoiceError::Configuration(_))
    ));
    let none: [(&str, &str); 0] = [];
    assert!(bag.set_outcome(1.0, none).is_err());

    bag.set_outcome(1.0, [("weather", "rain")]).unwrap();
    assert!(matches!(DecisionTree::new(&bag), Err(ChoiceError::Configuration(_))));
}

#[test]
fn test_rebuild_picks_up_new_overrides() {
    let mut tree = DecisionTree::new(&bid()).unwrap();
    assert_eq!(tree.nodes()[3].tag_value(), Some(200.0));
    tree.bag_mut()
        .set_outcome(150.0, [("bid", "low"), ("competitor_bid", "low"), ("cost", "low")])
        .unwrap();
    tree.rebuild().unwrap();
    assert_eq!(tree.nodes()[3].tag_value(), Some(150.0));
    assert_eq!(tree.nodes()[16].tag_value(), Some(200.0));
}

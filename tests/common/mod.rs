#![allow(dead_code)]

use choice_cli::nodes::NodeSpecBag;
use choice_cli::payoff::PathValues;
use choice_cli::tree::DecisionTree;

/// Profit of a winning bid; the bid wins when it is below the competitor's.
fn bid_payoff(path: &PathValues) -> f64 {
    let bid = path.value_or("bid", 0.0);
    let competitor_bid = path.value_or("competitor_bid", 0.0);
    let cost = path.value_or("cost", 0.0);
    if bid < competitor_bid {
        bid - cost
    } else {
        0.0
    }
}

fn bid_bag(bids: &[(&str, f64, &str)]) -> NodeSpecBag {
    let mut bag = NodeSpecBag::new();
    bag.add_decision("bid", bids.iter().copied(), true).unwrap();
    bag.add_chance(
        "competitor_bid",
        [
            ("low", 0.35, 400.0, "cost"),
            ("medium", 0.50, 600.0, "cost"),
            ("high", 0.15, 800.0, "cost"),
        ],
    )
    .unwrap();
    bag.add_chance(
        "cost",
        [
            ("low", 0.25, 200.0, "profit"),
            ("medium", 0.50, 400.0, "profit"),
            ("high", 0.25, 600.0, "profit"),
        ],
    )
    .unwrap();
    bag.add_terminal("profit", bid_payoff).unwrap();
    bag
}

/// Bid $500 or $700 against an uncertain competitor and cost.
pub fn bid() -> NodeSpecBag {
    bid_bag(&[("low", 500.0, "competitor_bid"), ("high", 700.0, "competitor_bid")])
}

pub fn bid_four() -> NodeSpecBag {
    bid_bag(&[
        ("500", 500.0, "competitor_bid"),
        ("600", 600.0, "competitor_bid"),
        ("700", 700.0, "competitor_bid"),
        ("800", 800.0, "competitor_bid"),
    ])
}

/// Cost distribution conditioned on the competitor's bid.
pub fn bid_dependent_probabilities() -> NodeSpecBag {
    let mut bag = bid();
    let table = [
        ("low", [0.40, 0.40, 0.20]),
        ("medium", [0.25, 0.50, 0.25]),
        ("high", [0.10, 0.45, 0.45]),
    ];
    for (competitor, probs) in table {
        for (cost, p) in ["low", "medium", "high"].into_iter().zip(probs) {
            bag.set_probability(p, [("competitor_bid", competitor), ("cost", cost)])
                .unwrap();
        }
    }
    bag
}

/// Cost values conditioned on both bids.
pub fn bid_dependent_outcomes() -> NodeSpecBag {
    let mut bag = bid();
    let table = [
        ("low", "low", [170.0, 350.0, 350.0]),
        ("low", "high", [190.0, 380.0, 570.0]),
        ("medium", "low", [200.0, 400.0, 600.0]),
        ("medium", "high", [220.0, 420.0, 610.0]),
        ("high", "low", [280.0, 450.0, 650.0]),
        ("high", "high", [300.0, 480.0, 680.0]),
    ];
    for (competitor, bid, costs) in table {
        for (cost, v) in ["low", "medium", "high"].into_iter().zip(costs) {
            bag.set_outcome(v, [("competitor_bid", competitor), ("bid", bid), ("cost", cost)])
                .unwrap();
        }
    }
    bag
}

/// Test, then drill. Test results revise the chance of finding oil.
pub fn oil() -> NodeSpecBag {
    let mut bag = NodeSpecBag::new();
    bag.add_decision(
        "test_decision",
        [("test", 55.0, "test_results"), ("dont-test", 0.0, "drill_decision")],
        true,
    )
    .unwrap();
    bag.add_chance(
        "test_results",
        [
            ("dry", 0.38, 0.0, "drill_decision"),
            ("small", 0.39, 0.0, "drill_decision"),
            ("large", 0.23, 0.0, "drill_decision"),
        ],
    )
    .unwrap();
    bag.add_decision(
        "drill_decision",
        [("drill", 600.0, "oil_found"), ("dont-drill", 0.0, "profit")],
        true,
    )
    .unwrap();
    bag.add_chance(
        "oil_found",
        [
            ("dry-well", 0.7895, 0.0, "profit"),
            ("small-well", 0.1579, 1500.0, "profit"),
            ("large-well", 0.0526, 3400.0, "profit"),
        ],
    )
    .unwrap();
    bag.add_terminal("profit", |p: &PathValues| {
        p.value_or("oil_found", 0.0) - p.value_or("drill_decision", 0.0) - p.value_or("test_decision", 0.0)
    })
    .unwrap();

    let revisions = [
        ("test_decision", "dont-test", [0.5000, 0.3000, 0.2000]),
        ("test_results", "small", [0.3846, 0.4615, 0.1539]),
        ("test_results", "large", [0.2174, 0.2609, 0.5217]),
    ];
    for (var, branch, probs) in revisions {
        for (well, p) in ["dry-well", "small-well", "large-well"].into_iter().zip(probs) {
            bag.set_probability(p, [(var, branch), ("oil_found", well)]).unwrap();
        }
    }
    bag
}

pub fn rolled_back(bag: &NodeSpecBag) -> DecisionTree {
    let mut tree = DecisionTree::new(bag).unwrap();
    tree.evaluate().unwrap();
    tree.rollback_ev().unwrap();
    tree
}

/// Index of the first node reached through `var = branch`.
pub fn find(tree: &DecisionTree, var: &str, branch: &str) -> usize {
    tree.nodes()
        .iter()
        .position(|n| n.is_tagged(var, branch))
        .unwrap()
}

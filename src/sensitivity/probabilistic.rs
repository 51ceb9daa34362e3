//! Sweeps the probability of a chance variable between its best and worst
//! branch.
//!
//! Every occurrence of the variable is first reduced to two branches: all
//! branch probabilities are zeroed, then at each grid point `p` the
//! highest-valued branch gets `1 - p` and the lowest-valued branch gets `p`.
//! When every branch has the same value both roles fall on the first branch,
//! which ends up with `p`.

use serde::Serialize;
use tracing::debug;

use super::{linspace, Probe, SweepResult};
use crate::error::{ChoiceError, ChoiceResult};
use crate::nodes::NodeSpec;
use crate::tree::DecisionTree;

/// Grid size of the probability sweep.
pub const PROBABILITY_POINTS: usize = 21;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilisticSensitivity {
    pub varname: String,
    pub top_branch: String,
    pub bottom_branch: String,
    /// x = probability of the bottom branch, y = EV.
    pub result: SweepResult,
}

/// EV at node `idx` (or at each of its branches for a decision node) as the
/// probability mass of `varname` moves from its top branch to its bottom
/// branch.
pub fn probabilistic_sensitivity(
    tree: &DecisionTree,
    varname: &str,
    idx: usize,
) -> ChoiceResult<ProbabilisticSensitivity> {
    match tree.bag().get(varname) {
        Some(NodeSpec::Chance { .. }) => {}
        Some(spec) => {
            return Err(ChoiceError::Configuration(format!(
                "Variable {} is {} != \"CHANCE\"",
                varname,
                spec.kind_str()
            )))
        }
        None => {
            return Err(ChoiceError::Configuration(format!(
                "Unknown variable: {}",
                varname
            )))
        }
    }

    let (top_branch, bottom_branch) = tree.bag().get_top_bottom_branches(varname)?;

    let probe = Probe::by_type(tree, idx)?;
    let mut work = tree.clone();
    work.evaluate()?;
    work.zero_probabilities(varname);

    let mut result = probe.empty_result(&work, "EV");
    for p in linspace(0.0, 1.0, PROBABILITY_POINTS) {
        work.set_tag_probability(varname, &top_branch, 1.0 - p);
        work.set_tag_probability(varname, &bottom_branch, p);
        work.rollback_ev()?;
        probe.record(&work, p, &mut result, |n| n.ev)?;
    }

    debug!(
        variable = varname,
        top = %top_branch,
        bottom = %bottom_branch,
        idx,
        "probabilistic sensitivity complete"
    );
    Ok(ProbabilisticSensitivity {
        varname: varname.to_string(),
        top_branch,
        bottom_branch,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeSpecBag;
    use crate::payoff::CumulativePayoff;

    fn coin() -> DecisionTree {
        let mut bag = NodeSpecBag::new();
        bag.add_decision("play", [("yes", 0.0, "coin"), ("no", 5.0, "end")], true)
            .unwrap();
        bag.add_chance(
            "coin",
            [("win", 0.5, 10.0, "end"), ("push", 0.25, 4.0, "end"), ("lose", 0.25, 0.0, "end")],
        )
        .unwrap();
        bag.add_terminal("end", CumulativePayoff).unwrap();
        let mut tree = DecisionTree::new(&bag).unwrap();
        tree.evaluate().unwrap();
        tree.rollback_ev().unwrap();
        tree
    }

    #[test]
    fn decision_target_yields_one_series_per_branch() {
        let tree = coin();
        let sens = probabilistic_sensitivity(&tree, "coin", 0).unwrap();
        assert_eq!(sens.top_branch, "win");
        assert_eq!(sens.bottom_branch, "lose");

        let series = sens.result.series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "yes");
        assert_eq!(series[0].len(), PROBABILITY_POINTS);
        // push branch is dropped from the sweep
        assert_eq!(series[0].points[0], (0.0, 10.0));
        assert_eq!(series[0].points[20], (1.0, 0.0));
        assert!(series[1].points.iter().all(|&(_, ev)| ev == 5.0));
    }

    #[test]
    fn source_tree_is_untouched() {
        let tree = coin();
        let before = tree.root().ev;
        probabilistic_sensitivity(&tree, "coin", 1).unwrap();
        assert_eq!(tree.root().ev, before);
        assert_eq!(tree.nodes()[2].tag_prob(), Some(0.5));
    }

    #[test]
    fn equal_valued_branches_still_sweep() {
        let mut bag = NodeSpecBag::new();
        bag.add_chance("a", [("x", 0.4, 5.0, "end"), ("y", 0.6, 5.0, "end")])
            .unwrap();
        bag.add_terminal("end", CumulativePayoff).unwrap();
        let mut tree = DecisionTree::new(&bag).unwrap();
        tree.evaluate().unwrap();
        tree.rollback_ev().unwrap();

        let sens = probabilistic_sensitivity(&tree, "a", 0).unwrap();
        assert_eq!(sens.top_branch, "x");
        assert_eq!(sens.bottom_branch, "x");
        let series = &sens.result.series()[0];
        assert_eq!(series.len(), PROBABILITY_POINTS);
        for &(p, ev) in &series.points {
            assert!((ev - 5.0 * p).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_decision_variable_and_terminal_target() {
        let tree = coin();
        assert!(matches!(
            probabilistic_sensitivity(&tree, "play", 0),
            Err(ChoiceError::Configuration(_))
        ));
        let terminal = tree.nodes().iter().position(|n| n.is_terminal()).unwrap();
        assert!(probabilistic_sensitivity(&tree, "coin", terminal).is_err());
    }
}

//! Sweeps the value of one branch of a variable.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{linspace, Probe, Series, SweepResult};
use crate::error::{ChoiceError, ChoiceResult};
use crate::tree::DecisionTree;

/// Branch whose value is swept: every tree occurrence of `branch` of
/// variable `varname` is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueTarget {
    pub varname: String,
    pub branch: String,
}

impl ValueTarget {
    pub fn new(varname: impl Into<String>, branch: impl Into<String>) -> Self {
        ValueTarget {
            varname: varname.into(),
            branch: branch.into(),
        }
    }

    /// `"variable:branch"`, the key used by tornado rankings.
    pub fn key(&self) -> String {
        format!("{}:{}", self.varname, self.branch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSweep {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_points")]
    pub n_points: usize,
}

fn default_points() -> usize {
    11
}

impl ValueSweep {
    pub fn new(min: f64, max: f64) -> Self {
        ValueSweep {
            min,
            max,
            n_points: default_points(),
        }
    }

    pub fn with_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    fn grid(&self) -> ChoiceResult<Vec<f64>> {
        if !self.min.is_finite() || !self.max.is_finite() || self.n_points == 0 {
            return Err(ChoiceError::Configuration(format!(
                "Invalid value sweep: min={} max={} n_points={}",
                self.min, self.max, self.n_points
            )));
        }
        Ok(linspace(self.min, self.max, self.n_points))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSensitivity {
    pub target: ValueTarget,
    /// Branch value before the sweep.
    pub base_value: f64,
    /// x = branch value, y = EV.
    pub result: SweepResult,
}

impl ValueSensitivity {
    /// The same curves with x expressed as percent change from the base
    /// value, the data behind a spider plot.
    pub fn spider(&self) -> ChoiceResult<Vec<Series>> {
        if self.base_value == 0.0 {
            return Err(ChoiceError::Configuration(format!(
                "Base value of {} is zero; percent change is undefined",
                self.target.key()
            )));
        }
        let base = self.base_value;
        Ok(self
            .result
            .series()
            .iter()
            .map(|s| Series {
                label: s.label.clone(),
                points: s
                    .points
                    .iter()
                    .map(|&(x, y)| (100.0 * (x - base) / base, y))
                    .collect(),
            })
            .collect())
    }
}

/// EV at node `idx` while the target branch value runs over `sweep`.
///
/// `single` reads the node itself; otherwise one series is produced per
/// immediate successor of the node.
pub fn value_sensitivity(
    tree: &DecisionTree,
    target: &ValueTarget,
    sweep: &ValueSweep,
    single: bool,
    idx: usize,
) -> ChoiceResult<ValueSensitivity> {
    let base_value = tree
        .nodes()
        .iter()
        .find(|n| n.is_tagged(&target.varname, &target.branch))
        .and_then(|n| n.tag_value())
        .ok_or_else(|| {
            ChoiceError::Configuration(format!(
                "Branch {} of variable {} does not occur in the tree",
                target.branch, target.varname
            ))
        })?;

    let probe = if single {
        tree.checked_node(idx)?;
        Probe::Node(idx)
    } else {
        Probe::per_branch(tree, idx)?
    };
    let grid = sweep.grid()?;

    let mut work = tree.clone();
    let mut result = probe.empty_result(&work, "EV");
    for value in grid {
        work.set_tag_value(&target.varname, &target.branch, value);
        work.evaluate()?;
        work.rollback_ev()?;
        probe.record(&work, value, &mut result, |n| n.ev)?;
    }

    debug!(target = %target.key(), base_value, idx, "value sensitivity complete");
    Ok(ValueSensitivity {
        target: target.clone(),
        base_value,
        result,
    })
}

/// Runs one single-mode value sweep per target in parallel, each on its own
/// clone of `tree`. Results keep the order of `targets`.
pub fn value_sensitivity_batch(
    tree: &DecisionTree,
    targets: &[(ValueTarget, ValueSweep)],
    idx: usize,
) -> ChoiceResult<Vec<ValueSensitivity>> {
    info!(targets = targets.len(), idx, "running value sensitivity batch");
    targets
        .par_iter()
        .map(|(target, sweep)| value_sensitivity(tree, target, sweep, true, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeSpecBag;
    use crate::payoff::CumulativePayoff;

    fn tree() -> DecisionTree {
        let mut bag = NodeSpecBag::new();
        bag.add_decision("d", [("a", 10.0, "c"), ("b", 12.0, "end")], true)
            .unwrap();
        bag.add_chance("c", [("up", 0.5, 6.0, "end"), ("down", 0.5, 0.0, "end")])
            .unwrap();
        bag.add_terminal("end", CumulativePayoff).unwrap();
        let mut tree = DecisionTree::new(&bag).unwrap();
        tree.evaluate().unwrap();
        tree.rollback_ev().unwrap();
        tree
    }

    #[test]
    fn single_mode_tracks_optimal_value() {
        let tree = tree();
        let target = ValueTarget::new("c", "up");
        let sens = value_sensitivity(&tree, &target, &ValueSweep::new(0.0, 10.0), true, 0).unwrap();

        assert_eq!(sens.base_value, 6.0);
        let series = &sens.result.series()[0];
        assert_eq!(series.len(), 11);
        // a: 10 + up/2, b: 12
        assert_eq!(series.points[0], (0.0, 12.0));
        assert_eq!(series.points[10], (10.0, 15.0));
    }

    #[test]
    fn multiple_mode_has_series_per_branch() {
        let tree = tree();
        let target = ValueTarget::new("c", "up");
        let sweep = ValueSweep::new(0.0, 4.0).with_points(3);
        let sens = value_sensitivity(&tree, &target, &sweep, false, 0).unwrap();
        let series = sens.result.series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "a");
        assert_eq!(series[0].ys(), vec![10.0, 11.0, 12.0]);
        assert_eq!(series[1].ys(), vec![12.0, 12.0, 12.0]);
    }

    #[test]
    fn spider_is_percent_change() {
        let tree = tree();
        let target = ValueTarget::new("c", "up");
        let sweep = ValueSweep::new(3.0, 9.0).with_points(3);
        let sens = value_sensitivity(&tree, &target, &sweep, true, 0).unwrap();
        let spider = sens.spider().unwrap();
        assert_eq!(spider[0].xs(), vec![-50.0, 0.0, 50.0]);
    }

    #[test]
    fn unknown_branch_and_bad_grid() {
        let tree = tree();
        let sweep = ValueSweep::new(0.0, 1.0);
        assert!(value_sensitivity(&tree, &ValueTarget::new("c", "sideways"), &sweep, true, 0).is_err());
        let empty = ValueSweep::new(0.0, 1.0).with_points(0);
        assert!(value_sensitivity(&tree, &ValueTarget::new("c", "up"), &empty, true, 0).is_err());
    }

    #[test]
    fn batch_preserves_order() {
        let tree = tree();
        let targets = vec![
            (ValueTarget::new("c", "up"), ValueSweep::new(0.0, 10.0)),
            (ValueTarget::new("d", "b"), ValueSweep::new(0.0, 20.0)),
        ];
        let results = value_sensitivity_batch(&tree, &targets, 0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].target.key(), "c:up");
        assert_eq!(results[1].base_value, 12.0);
        assert_eq!(tree.root().ev, Some(13.0));
    }
}

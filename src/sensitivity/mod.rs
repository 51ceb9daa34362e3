//! Sensitivity analysis.
//!
//! Every sweep clones the tree it is given, perturbs one quantity across a
//! grid, re-rolls the clone at each grid point and collects the values read
//! at a target node. The caller's tree is never mutated.

pub mod probabilistic;
pub mod risk;
pub mod tornado;
pub mod value;

pub use probabilistic::{probabilistic_sensitivity, ProbabilisticSensitivity, PROBABILITY_POINTS};
pub use risk::{risk_sensitivity, RiskSensitivity, RISK_POINTS};
pub use tornado::{tornado, TornadoBar};
pub use value::{value_sensitivity, value_sensitivity_batch, ValueSensitivity, ValueSweep, ValueTarget};

use serde::Serialize;

use crate::error::{ChoiceError, ChoiceResult};
use crate::tree::{DecisionTree, NodeKind, TreeNode};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Ordered `(x, y)` pairs of one curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>) -> Self {
        Series {
            label: label.into(),
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|&(x, _)| x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, y)| y).collect()
    }
}

/// One curve for the target node, or one per immediate successor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SweepResult {
    Single(Series),
    PerBranch(Vec<Series>),
}

impl SweepResult {
    pub fn series(&self) -> &[Series] {
        match self {
            SweepResult::Single(s) => std::slice::from_ref(s),
            SweepResult::PerBranch(all) => all,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, SweepResult::Single(_))
    }
}

/// `n` evenly spaced points from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Shared sweep plumbing
// ---------------------------------------------------------------------------

/// Where a sweep reads its values after each rollback.
pub(crate) enum Probe {
    Node(usize),
    Successors(Vec<usize>),
}

impl Probe {
    /// Decision targets are probed per branch, everything else at the node.
    pub(crate) fn by_type(tree: &DecisionTree, idx: usize) -> ChoiceResult<Self> {
        let node = tree.checked_node(idx)?;
        if node.is_terminal() {
            return Err(ChoiceError::Configuration(format!(
                "Sensitivity target {} ({}) is a terminal node",
                idx, node.name
            )));
        }
        if matches!(node.kind, NodeKind::Decision { .. }) {
            Ok(Probe::Successors(node.successors().to_vec()))
        } else {
            Ok(Probe::Node(idx))
        }
    }

    pub(crate) fn per_branch(tree: &DecisionTree, idx: usize) -> ChoiceResult<Self> {
        let node = tree.checked_node(idx)?;
        if node.is_terminal() {
            return Err(ChoiceError::Configuration(format!(
                "Node {} ({}) has no branches to compare",
                idx, node.name
            )));
        }
        Ok(Probe::Successors(node.successors().to_vec()))
    }

    pub(crate) fn empty_result(&self, tree: &DecisionTree, single_label: &str) -> SweepResult {
        match self {
            Probe::Node(_) => SweepResult::Single(Series::new(single_label)),
            Probe::Successors(successors) => SweepResult::PerBranch(
                successors
                    .iter()
                    .map(|&s| Series::new(tree.nodes()[s].tag_branch().unwrap_or_default()))
                    .collect(),
            ),
        }
    }

    /// Appends `(x, read(node))` to every series of `result`.
    pub(crate) fn record<F>(
        &self,
        tree: &DecisionTree,
        x: f64,
        result: &mut SweepResult,
        read: F,
    ) -> ChoiceResult<()>
    where
        F: Fn(&TreeNode) -> Option<f64>,
    {
        let read_at = |idx: usize| {
            let node = &tree.nodes()[idx];
            read(node).ok_or_else(|| {
                ChoiceError::Evaluation(format!("Node {} ({}) has no value after rollback", idx, node.name))
            })
        };
        match (self, result) {
            (Probe::Node(idx), SweepResult::Single(series)) => {
                series.points.push((x, read_at(*idx)?));
            }
            (Probe::Successors(successors), SweepResult::PerBranch(all)) => {
                for (series, &s) in all.iter_mut().zip(successors) {
                    series.points.push((x, read_at(s)?));
                }
            }
            _ => {
                return Err(ChoiceError::Evaluation(
                    "Sweep result does not match its probe".to_string(),
                ))
            }
        }
        Ok(())
    }
}

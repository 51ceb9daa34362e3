//! Risk profiles: the distribution of terminal payoffs reachable from a node
//! when the current optimal strategy is followed.

use serde::Serialize;
use tracing::debug;

use crate::error::{ChoiceError, ChoiceResult};
use crate::tree::{DecisionTree, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileRow {
    pub value: f64,
    pub probability: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskProfile {
    /// `"<branch>; EV=<ev>"`, or `"EV=<ev>"` for the root.
    pub label: String,
    pub node: usize,
    pub ev: f64,
    /// Sorted by value.
    pub rows: Vec<ProfileRow>,
}

impl RiskProfile {
    pub fn total_probability(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.cumulative)
    }
}

/// Profiles node `idx` (`single`) or each of its immediate successors.
/// The tree must have been rolled back.
pub fn risk_profile(tree: &DecisionTree, idx: usize, single: bool) -> ChoiceResult<Vec<RiskProfile>> {
    let node = tree.checked_node(idx)?;
    let targets: Vec<usize> = if single {
        vec![idx]
    } else if node.is_terminal() {
        return Err(ChoiceError::Configuration(format!(
            "Node {} ({}) has no branches to profile",
            idx, node.name
        )));
    } else {
        node.successors().to_vec()
    };

    let profiles = targets
        .into_iter()
        .map(|target| profile_of(tree, target))
        .collect::<ChoiceResult<Vec<_>>>()?;
    debug!(idx, single, profiles = profiles.len(), "risk profile computed");
    Ok(profiles)
}

fn profile_of(tree: &DecisionTree, idx: usize) -> ChoiceResult<RiskProfile> {
    let node = &tree.nodes()[idx];
    let ev = node.ev.ok_or_else(|| {
        ChoiceError::Evaluation(format!(
            "Node {} ({}) has no expected value; call rollback() first",
            idx, node.name
        ))
    })?;

    let mut outcomes = distribution(tree, idx)?;
    outcomes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut cumulative = 0.0;
    let rows = outcomes
        .into_iter()
        .map(|(value, probability)| {
            cumulative += probability;
            ProfileRow {
                value,
                probability,
                cumulative,
            }
        })
        .collect();

    let label = match node.tag_branch() {
        Some(branch) => format!("{}; EV={:.2}", branch, ev),
        None => format!("EV={:.2}", ev),
    };
    Ok(RiskProfile {
        label,
        node: idx,
        ev,
        rows,
    })
}

/// `(value, probability)` pairs with distinct values, unsorted.
fn distribution(tree: &DecisionTree, idx: usize) -> ChoiceResult<Vec<(f64, f64)>> {
    let node = &tree.nodes()[idx];
    match &node.kind {
        NodeKind::Terminal { .. } => {
            let ev = node.ev.ok_or_else(|| {
                ChoiceError::Evaluation(format!("Terminal node {} ({}) has no value", idx, node.name))
            })?;
            Ok(vec![(ev, 1.0)])
        }
        NodeKind::Decision { .. } => {
            let chosen = node.optimal_successor().ok_or_else(|| {
                ChoiceError::Evaluation(format!(
                    "Decision node {} ({}) has no optimal branch; call rollback() first",
                    idx, node.name
                ))
            })?;
            distribution(tree, chosen)
        }
        NodeKind::Chance {
            successors,
            forced_branch: Some(branch),
            ..
        } => distribution(tree, successors[*branch]),
        NodeKind::Chance { successors, .. } => {
            let mut mixed: Vec<(f64, f64)> = Vec::new();
            for &successor in successors {
                let prob = tree.nodes()[successor].tag_prob().unwrap_or(0.0);
                for (value, p) in distribution(tree, successor)? {
                    match mixed.iter_mut().find(|(v, _)| *v == value) {
                        Some(entry) => entry.1 += prob * p,
                        None => mixed.push((value, prob * p)),
                    }
                }
            }
            Ok(mixed)
        }
    }
}

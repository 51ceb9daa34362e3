//! JSON tree definitions.
//!
//! ```json
//! {
//!   "probability_policy": "must_sum_to_one",
//!   "nodes": [
//!     {"name": "bid", "type": "decision", "maximize": true,
//!      "branches": [{"label": "low", "value": 500, "next": "profit"}]},
//!     {"name": "profit", "type": "terminal", "payoff": {"kind": "cumulative"}}
//!   ],
//!   "dependent_probabilities": [{"probability": 0.4, "conditions": {"bid": "low"}}],
//!   "dependent_outcomes": []
//! }
//! ```
//!
//! The first node is the root. Terminals without a `payoff` use the
//! cumulative payoff.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ChoiceError, ChoiceResult};
use crate::nodes::{ChanceBranch, Conditions, DecisionBranch, NodeSpecBag, ProbabilityPolicy};
use crate::payoff::{CumulativePayoff, LinearPayoff};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeFile {
    #[serde(default)]
    pub probability_policy: ProbabilityPolicy,
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub dependent_probabilities: Vec<ProbabilityEntry>,
    #[serde(default)]
    pub dependent_outcomes: Vec<OutcomeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Decision,
    Chance,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default = "default_maximize")]
    pub maximize: bool,
    #[serde(default)]
    pub branches: Vec<BranchEntry>,
    #[serde(default)]
    pub payoff: Option<PayoffEntry>,
}

fn default_maximize() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchEntry {
    pub label: String,
    #[serde(default)]
    pub probability: Option<f64>,
    pub value: f64,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PayoffEntry {
    Cumulative,
    Linear {
        #[serde(default)]
        weights: BTreeMap<String, f64>,
        #[serde(default)]
        constant: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEntry {
    pub probability: f64,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub outcome: f64,
    pub conditions: Conditions,
}

impl TreeFile {
    pub fn from_json(json: &str) -> ChoiceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a validated bag. Every node goes through the same insertion
    /// checks as programmatic construction.
    pub fn into_bag(self) -> ChoiceResult<NodeSpecBag> {
        if self.nodes.is_empty() {
            return Err(ChoiceError::Validation("Tree file defines no nodes".to_string()));
        }

        let mut bag = NodeSpecBag::with_policy(self.probability_policy);
        for entry in self.nodes {
            match entry.node_type {
                NodeType::Decision => {
                    let branches = entry
                        .branches
                        .into_iter()
                        .enumerate()
                        .map(|(i, b)| match b.probability {
                            None => Ok(DecisionBranch::new(b.label, b.value, b.next)),
                            Some(_) => Err(invalid_branch(i, &entry.name)),
                        })
                        .collect::<ChoiceResult<Vec<_>>>()?;
                    bag.add_decision(&entry.name, branches, entry.maximize)?;
                }
                NodeType::Chance => {
                    let branches = entry
                        .branches
                        .into_iter()
                        .enumerate()
                        .map(|(i, b)| match b.probability {
                            Some(p) => Ok(ChanceBranch::new(b.label, p, b.value, b.next)),
                            None => Err(invalid_branch(i, &entry.name)),
                        })
                        .collect::<ChoiceResult<Vec<_>>>()?;
                    bag.add_chance(&entry.name, branches)?;
                }
                NodeType::Terminal => {
                    if !entry.branches.is_empty() {
                        return Err(ChoiceError::Validation(format!(
                            "Terminal node {} must not have branches",
                            entry.name
                        )));
                    }
                    match entry.payoff.unwrap_or(PayoffEntry::Cumulative) {
                        PayoffEntry::Cumulative => bag.add_terminal(&entry.name, CumulativePayoff)?,
                        PayoffEntry::Linear { weights, constant } => {
                            bag.add_terminal(&entry.name, LinearPayoff { weights, constant })?
                        }
                    }
                }
            }
        }

        for dep in self.dependent_probabilities {
            bag.set_probability(dep.probability, dep.conditions)?;
        }
        for dep in self.dependent_outcomes {
            bag.set_outcome(dep.outcome, dep.conditions)?;
        }
        Ok(bag)
    }
}

fn invalid_branch(i: usize, name: &str) -> ChoiceError {
    ChoiceError::Validation(format!(
        "Branch #{} of variable {} has invalid information",
        i, name
    ))
}

/// Reads and validates a tree definition file.
pub fn load_tree_file(path: impl AsRef<Path>) -> ChoiceResult<NodeSpecBag> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let bag = TreeFile::from_json(&json)?.into_bag()?;
    info!(path = %path.display(), nodes = bag.len(), "tree file loaded");
    Ok(bag)
}

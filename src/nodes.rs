//! Node specifications: the named decision, chance and terminal nodes a tree
//! is expanded from, plus the path-conditioned probability/outcome overrides.
//!
//! The bag validates every node when it is inserted, so a malformed
//! specification never reaches tree construction.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChoiceError, ChoiceResult};
use crate::payoff::{Payoff, PayoffFn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do with chance probabilities that do not add up to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityPolicy {
    /// Reject the node unless the probabilities sum to exactly 1.0.
    #[default]
    MustSumToOne,
    /// Rescale the probabilities so they sum to 1.0.
    Normalize,
}

// ---------------------------------------------------------------------------
// Branches and node specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionBranch {
    pub label: String,
    pub value: f64,
    pub next: String,
}

impl DecisionBranch {
    pub fn new(label: impl Into<String>, value: f64, next: impl Into<String>) -> Self {
        DecisionBranch {
            label: label.into(),
            value,
            next: next.into(),
        }
    }
}

impl From<(&str, f64, &str)> for DecisionBranch {
    fn from((label, value, next): (&str, f64, &str)) -> Self {
        DecisionBranch::new(label, value, next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChanceBranch {
    pub label: String,
    pub probability: f64,
    pub value: f64,
    pub next: String,
}

impl ChanceBranch {
    pub fn new(
        label: impl Into<String>,
        probability: f64,
        value: f64,
        next: impl Into<String>,
    ) -> Self {
        ChanceBranch {
            label: label.into(),
            probability,
            value,
            next: next.into(),
        }
    }
}

impl From<(&str, f64, f64, &str)> for ChanceBranch {
    fn from((label, probability, value, next): (&str, f64, f64, &str)) -> Self {
        ChanceBranch::new(label, probability, value, next)
    }
}

#[derive(Debug, Clone)]
pub enum NodeSpec {
    Decision {
        branches: Vec<DecisionBranch>,
        maximize: bool,
    },
    Chance {
        branches: Vec<ChanceBranch>,
    },
    Terminal {
        payoff: Option<PayoffFn>,
    },
}

impl NodeSpec {
    pub fn kind_str(&self) -> &'static str {
        match self {
            NodeSpec::Decision { .. } => "DECISION",
            NodeSpec::Chance { .. } => "CHANCE",
            NodeSpec::Terminal { .. } => "TERMINAL",
        }
    }

    /// Names of the successor nodes, in branch order (empty for terminals).
    pub fn successor_names(&self) -> Vec<&str> {
        match self {
            NodeSpec::Decision { branches, .. } => branches.iter().map(|b| b.next.as_str()).collect(),
            NodeSpec::Chance { branches } => branches.iter().map(|b| b.next.as_str()).collect(),
            NodeSpec::Terminal { .. } => Vec::new(),
        }
    }

    /// (label, value) of every branch, in order.
    pub fn branch_values(&self) -> Vec<(&str, f64)> {
        match self {
            NodeSpec::Decision { branches, .. } => {
                branches.iter().map(|b| (b.label.as_str(), b.value)).collect()
            }
            NodeSpec::Chance { branches } => {
                branches.iter().map(|b| (b.label.as_str(), b.value)).collect()
            }
            NodeSpec::Terminal { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Ancestor variable name → required branch label.
pub type Conditions = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct DependentProbability {
    pub probability: f64,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependentOutcome {
    pub outcome: f64,
    pub conditions: Conditions,
}

fn collect_conditions<I, K, V>(conditions: I) -> ChoiceResult<Conditions>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let conditions: Conditions = conditions
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    if conditions.is_empty() {
        return Err(ChoiceError::Configuration(
            "Override must have at least one condition".to_string(),
        ));
    }
    Ok(conditions)
}

// ---------------------------------------------------------------------------
// Bag
// ---------------------------------------------------------------------------

/// Named node specifications in insertion order. The first inserted name is
/// the root variable of any tree built from the bag.
#[derive(Debug, Clone, Default)]
pub struct NodeSpecBag {
    order: Vec<String>,
    specs: HashMap<String, NodeSpec>,
    policy: ProbabilityPolicy,
    dependent_probabilities: Vec<DependentProbability>,
    dependent_outcomes: Vec<DependentOutcome>,
}

impl NodeSpecBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ProbabilityPolicy) -> Self {
        NodeSpecBag {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ProbabilityPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&NodeSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Node names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn root_name(&self) -> Option<&str> {
        self.order.first().map(|s| s.as_str())
    }

    pub fn dependent_probabilities(&self) -> &[DependentProbability] {
        &self.dependent_probabilities
    }

    pub fn dependent_outcomes(&self) -> &[DependentOutcome] {
        &self.dependent_outcomes
    }

    fn insert(&mut self, name: &str, spec: NodeSpec) {
        debug!(node = name, kind = spec.kind_str(), "node spec added");
        if self.specs.insert(name.to_string(), spec).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn add_decision<I, B>(&mut self, name: &str, branches: I, maximize: bool) -> ChoiceResult<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<DecisionBranch>,
    {
        let branches: Vec<DecisionBranch> = branches.into_iter().map(Into::into).collect();
        check_branch_shape(
            name,
            branches.iter().map(|b| (b.label.as_str(), b.value, b.next.as_str())),
        )?;
        self.insert(name, NodeSpec::Decision { branches, maximize });
        Ok(())
    }

    pub fn add_chance<I, B>(&mut self, name: &str, branches: I) -> ChoiceResult<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<ChanceBranch>,
    {
        let mut branches: Vec<ChanceBranch> = branches.into_iter().map(Into::into).collect();
        check_branch_shape(
            name,
            branches.iter().map(|b| (b.label.as_str(), b.value, b.next.as_str())),
        )?;

        for (i, b) in branches.iter().enumerate() {
            if !b.probability.is_finite() || b.probability < 0.0 {
                return Err(ChoiceError::Validation(format!(
                    "Branch #{} of variable {} has invalid probability {}",
                    i, name, b.probability
                )));
            }
        }

        let total: f64 = branches.iter().map(|b| b.probability).sum();
        match self.policy {
            ProbabilityPolicy::MustSumToOne => {
                if total != 1.0 {
                    return Err(ChoiceError::Validation(format!(
                        "Sum of probabilities for variable {} must be 100% (got {})",
                        name, total
                    )));
                }
            }
            ProbabilityPolicy::Normalize => {
                if total <= 0.0 {
                    return Err(ChoiceError::Validation(format!(
                        "Cannot normalize probabilities of variable {}: they sum to {}",
                        name, total
                    )));
                }
                if total != 1.0 {
                    for b in branches.iter_mut() {
                        b.probability /= total;
                    }
                }
            }
        }

        self.insert(name, NodeSpec::Chance { branches });
        Ok(())
    }

    pub fn add_terminal<P: Payoff + 'static>(&mut self, name: &str, payoff: P) -> ChoiceResult<()> {
        check_name(name)?;
        self.insert(name, NodeSpec::Terminal { payoff: Some(PayoffFn::new(payoff)) });
        Ok(())
    }

    /// Declares a terminal with no payoff bound; evaluating a tree that
    /// reaches it fails.
    pub fn add_terminal_without_payoff(&mut self, name: &str) -> ChoiceResult<()> {
        check_name(name)?;
        self.insert(name, NodeSpec::Terminal { payoff: None });
        Ok(())
    }

    /// Overrides the probability of every chance branch whose ancestor path
    /// matches all `conditions`.
    pub fn set_probability<I, K, V>(&mut self, probability: f64, conditions: I) -> ChoiceResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ChoiceError::Configuration(format!(
                "Dependent probability {} is outside [0, 1]",
                probability
            )));
        }
        let conditions = collect_conditions(conditions)?;
        self.dependent_probabilities.push(DependentProbability {
            probability,
            conditions,
        });
        Ok(())
    }

    /// Overrides the value of every branch whose ancestor path matches all
    /// `conditions`.
    pub fn set_outcome<I, K, V>(&mut self, outcome: f64, conditions: I) -> ChoiceResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !outcome.is_finite() {
            return Err(ChoiceError::Configuration(format!(
                "Dependent outcome {} is not finite",
                outcome
            )));
        }
        let conditions = collect_conditions(conditions)?;
        self.dependent_outcomes.push(DependentOutcome { outcome, conditions });
        Ok(())
    }

    /// Labels of the branches with the largest and smallest value. Ties go
    /// to the earliest branch.
    pub fn get_top_bottom_branches(&self, name: &str) -> ChoiceResult<(String, String)> {
        let spec = self.get(name).ok_or_else(|| {
            ChoiceError::Configuration(format!("Unknown variable: {}", name))
        })?;
        let values = spec.branch_values();
        let (first_label, first_value) = *values.first().ok_or_else(|| {
            ChoiceError::Configuration(format!("Variable {} has no branches", name))
        })?;

        let mut top = (first_label, first_value);
        let mut bottom = (first_label, first_value);
        for &(label, value) in &values[1..] {
            if value > top.1 {
                top = (label, value);
            }
            if value < bottom.1 {
                bottom = (label, value);
            }
        }
        Ok((top.0.to_string(), bottom.0.to_string()))
    }
}

fn check_name(name: &str) -> ChoiceResult<()> {
    if name.trim().is_empty() {
        return Err(ChoiceError::Validation("Node name must not be empty".to_string()));
    }
    Ok(())
}

fn check_branch_shape<'a>(
    name: &str,
    branches: impl Iterator<Item = (&'a str, f64, &'a str)>,
) -> ChoiceResult<()> {
    check_name(name)?;
    let mut seen: Vec<&str> = Vec::new();
    for (i, (label, value, next)) in branches.enumerate() {
        if label.is_empty() || next.is_empty() || !value.is_finite() {
            return Err(ChoiceError::Validation(format!(
                "Branch #{} of variable {} has invalid information",
                i, name
            )));
        }
        if seen.contains(&label) {
            return Err(ChoiceError::Validation(format!(
                "Variable {} has duplicate branch label {}",
                name, label
            )));
        }
        seen.push(label);
    }
    if seen.is_empty() {
        return Err(ChoiceError::Validation(format!(
            "Variable {} must have at least one branch",
            name
        )));
    }
    Ok(())
}

//! Terminal payoff functions.
//!
//! A payoff receives everything known about the path from the root to a
//! terminal: the value, probability and branch label chosen for every
//! ancestor variable. Any `Fn(&PathValues) -> f64` closure is a payoff;
//! implement [`Payoff`] directly when the computation can fail.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ChoiceResult;

/// Accumulated ancestor choices along one root-to-terminal path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathValues {
    /// Variable name → value of the chosen branch.
    pub values: BTreeMap<String, f64>,
    /// Variable name → probability of the chosen branch (chance variables only).
    pub probabilities: BTreeMap<String, f64>,
    /// Variable name → label of the chosen branch.
    pub branches: BTreeMap<String, String>,
}

impl PathValues {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of `name`, or `default` when the path never crossed that variable.
    pub fn value_or(&self, name: &str, default: f64) -> f64 {
        self.value(name).unwrap_or(default)
    }

    pub fn probability(&self, name: &str) -> Option<f64> {
        self.probabilities.get(name).copied()
    }

    pub fn branch(&self, name: &str) -> Option<&str> {
        self.branches.get(name).map(|s| s.as_str())
    }
}

pub trait Payoff: Send + Sync {
    fn payoff(&self, path: &PathValues) -> ChoiceResult<f64>;
}

impl<F> Payoff for F
where
    F: Fn(&PathValues) -> f64 + Send + Sync,
{
    fn payoff(&self, path: &PathValues) -> ChoiceResult<f64> {
        Ok(self(path))
    }
}

/// Shared, immutable payoff handle stored on terminal nodes.
#[derive(Clone)]
pub struct PayoffFn(Arc<dyn Payoff>);

impl PayoffFn {
    pub fn new<P: Payoff + 'static>(payoff: P) -> Self {
        PayoffFn(Arc::new(payoff))
    }

    pub fn call(&self, path: &PathValues) -> ChoiceResult<f64> {
        self.0.payoff(path)
    }
}

impl fmt::Debug for PayoffFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayoffFn(..)")
    }
}

/// Sum of every branch value along the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CumulativePayoff;

impl Payoff for CumulativePayoff {
    fn payoff(&self, path: &PathValues) -> ChoiceResult<f64> {
        Ok(path.values.values().sum())
    }
}

/// `constant + Σ weight[var] * value[var]`; variables absent from the path count as 0.
#[derive(Debug, Clone, Default)]
pub struct LinearPayoff {
    pub weights: BTreeMap<String, f64>,
    pub constant: f64,
}

impl Payoff for LinearPayoff {
    fn payoff(&self, path: &PathValues) -> ChoiceResult<f64> {
        let total = self
            .weights
            .iter()
            .map(|(name, w)| w * path.value_or(name, 0.0))
            .sum::<f64>();
        Ok(self.constant + total)
    }
}

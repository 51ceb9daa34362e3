//! Certainty equivalents across risk attitudes, from risk neutral up to a
//! given risk tolerance.

use serde::Serialize;
use tracing::debug;

use super::{linspace, Probe, SweepResult};
use crate::error::{ChoiceError, ChoiceResult};
use crate::tree::DecisionTree;
use crate::utility::{UtilityFn, View};

/// Grid size of the risk-aversion sweep.
pub const RISK_POINTS: usize = 11;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSensitivity {
    pub utility: UtilityFn,
    /// Risk tolerance per grid point; `None` is risk neutral (infinite
    /// tolerance).
    pub risk_tolerances: Vec<Option<f64>>,
    /// x = risk aversion (1 / tolerance), y = CE (EV at aversion 0).
    pub result: SweepResult,
}

/// Sweeps risk aversion over `linspace(0, 1 / risk_tolerance, 11)`.
///
/// A decision target yields one CE series per branch, a chance target a
/// single series read at the node.
pub fn risk_sensitivity(
    tree: &DecisionTree,
    utility: UtilityFn,
    risk_tolerance: f64,
    idx: usize,
) -> ChoiceResult<RiskSensitivity> {
    if !(risk_tolerance.is_finite() && risk_tolerance > 0.0) {
        return Err(ChoiceError::Configuration(format!(
            "Risk tolerance must be positive and finite, got {}",
            risk_tolerance
        )));
    }

    let probe = Probe::by_type(tree, idx)?;
    let mut work = tree.clone();
    work.evaluate()?;

    let label = work.nodes()[idx].name.clone();
    let mut result = probe.empty_result(&work, &label);
    let mut risk_tolerances = Vec::with_capacity(RISK_POINTS);

    for aversion in linspace(0.0, 1.0 / risk_tolerance, RISK_POINTS) {
        if aversion == 0.0 {
            work.rollback_ev()?;
            probe.record(&work, aversion, &mut result, |n| n.ev)?;
            risk_tolerances.push(None);
        } else {
            let tolerance = 1.0 / aversion;
            work.rollback(View::Ce, Some(utility), tolerance)?;
            probe.record(&work, aversion, &mut result, |n| n.ce)?;
            risk_tolerances.push(Some(tolerance));
        }
    }

    debug!(utility = %utility, risk_tolerance, idx, "risk sensitivity complete");
    Ok(RiskSensitivity {
        utility,
        risk_tolerances,
        result,
    })
}

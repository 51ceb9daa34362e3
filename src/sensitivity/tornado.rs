//! Tornado ranking of value sensitivities.

use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

use super::ValueSensitivity;
use crate::error::{ChoiceError, ChoiceResult};

/// One bar: the EV range spanned while a single branch value was swept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoBar {
    /// `"variable:branch"`
    pub key: String,
    /// `max EV - min EV`
    pub swing: f64,
    /// `min EV`, where the bar starts.
    pub low: f64,
}

impl TornadoBar {
    pub fn high(&self) -> f64 {
        self.low + self.swing
    }
}

/// Bars sorted by swing, widest first. Each input must be a single-mode
/// sweep.
pub fn tornado(sensitivities: &[ValueSensitivity]) -> ChoiceResult<Vec<TornadoBar>> {
    let mut bars = sensitivities
        .iter()
        .map(|sens| {
            let key = sens.target.key();
            if !sens.result.is_single() {
                return Err(ChoiceError::Configuration(format!(
                    "Tornado input {} must be a single-mode sweep",
                    key
                )));
            }
            let (low, high) = match sens.result.series()[0].ys().into_iter().minmax_by(f64::total_cmp) {
                MinMaxResult::NoElements => {
                    return Err(ChoiceError::Configuration(format!(
                        "Tornado input {} has no points",
                        key
                    )))
                }
                MinMaxResult::OneElement(v) => (v, v),
                MinMaxResult::MinMax(lo, hi) => (lo, hi),
            };
            Ok(TornadoBar {
                key,
                swing: high - low,
                low,
            })
        })
        .collect::<ChoiceResult<Vec<_>>>()?;

    bars.sort_by(|a, b| b.swing.total_cmp(&a.swing));
    Ok(bars)
}

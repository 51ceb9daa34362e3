use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChoiceError, ChoiceResult};

/// Cap applied to expected utility before inverting the exponential utility,
/// keeping the certainty equivalent finite.
pub const MAX_EXP_UTILITY: f64 = 0.9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtilityFn {
    /// `u(x) = 1 - exp(-x / R)`
    #[serde(rename = "exp")]
    Exponential,
    /// `u(x) = ln(x + R)`
    #[serde(rename = "log")]
    Logarithmic,
}

impl UtilityFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityFn::Exponential => "exp",
            UtilityFn::Logarithmic => "log",
        }
    }

    /// Utility of `value` for a decision maker with the given risk tolerance.
    pub fn utility(&self, value: f64, risk_tolerance: f64) -> ChoiceResult<f64> {
        match self {
            UtilityFn::Exponential => Ok(1.0 - (-value / risk_tolerance).exp()),
            UtilityFn::Logarithmic => {
                let shifted = value + risk_tolerance;
                if shifted <= 0.0 {
                    return Err(ChoiceError::Evaluation(format!(
                        "Value {} is outside the domain of the log utility (risk tolerance {})",
                        value, risk_tolerance
                    )));
                }
                Ok(shifted.ln())
            }
        }
    }

    /// Certainty equivalent of an expected utility.
    pub fn inverse(&self, utility: f64, risk_tolerance: f64) -> f64 {
        match self {
            UtilityFn::Exponential => -risk_tolerance * (1.0 - utility.min(MAX_EXP_UTILITY)).ln(),
            UtilityFn::Logarithmic => utility.exp() - risk_tolerance,
        }
    }

    /// Parses an optional identifier: `None`, `""` and `"none"` mean no
    /// utility transform.
    pub fn parse_optional(s: Option<&str>) -> ChoiceResult<Option<UtilityFn>> {
        match s {
            None | Some("") | Some("none") => Ok(None),
            Some(id) => id.parse().map(Some),
        }
    }
}

impl FromStr for UtilityFn {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exp" => Ok(UtilityFn::Exponential),
            "log" => Ok(UtilityFn::Logarithmic),
            other => Err(ChoiceError::Configuration(format!(
                "Utility function {} unknown. Valid options: exp, log",
                other
            ))),
        }
    }
}

impl fmt::Display for UtilityFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantity reported by a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Expected value.
    #[default]
    Ev,
    /// Expected utility.
    Eu,
    /// Certainty equivalent.
    Ce,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Ev => "ev",
            View::Eu => "eu",
            View::Ce => "ce",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Ev => "EV",
            View::Eu => "EU",
            View::Ce => "CE",
        }
    }
}

impl FromStr for View {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ev" => Ok(View::Ev),
            "eu" => Ok(View::Eu),
            "ce" => Ok(View::Ce),
            other => Err(ChoiceError::Configuration(format!(
                "View {} unknown. Valid options: ev, eu, ce",
                other
            ))),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

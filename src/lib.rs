//! Decision tree analysis: tree construction from named node specifications,
//! path-conditioned overrides, terminal payoff evaluation, backward induction
//! with optional utility transforms, sensitivity sweeps and risk profiles.

pub mod cli;
pub mod display;
pub mod error;
mod evaluate;
pub mod nodes;
mod overrides;
pub mod payoff;
pub mod risk_profile;
mod rollback;
pub mod sensitivity;
pub mod tree;
pub mod tree_file;
pub mod utility;

pub use error::{ChoiceError, ChoiceResult};
pub use nodes::{NodeSpecBag, ProbabilityPolicy};
pub use payoff::{CumulativePayoff, LinearPayoff, PathValues, Payoff};
pub use tree::DecisionTree;
pub use utility::{UtilityFn, View};

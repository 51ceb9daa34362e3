//! Terminal payoff evaluation.

use tracing::debug;

use crate::error::{ChoiceError, ChoiceResult};
use crate::payoff::PathValues;
use crate::tree::{DecisionTree, NodeKind};

impl DecisionTree {
    /// Computes the EV of every terminal node by calling its payoff with the
    /// values, probabilities and branch labels chosen along its path.
    ///
    /// Previous rollback results are cleared; call `rollback` afterwards.
    pub fn evaluate(&mut self) -> ChoiceResult<()> {
        self.clear_results();
        self.evaluate_node(0, PathValues::default())?;
        debug!(nodes = self.len(), "terminal payoffs evaluated");
        Ok(())
    }

    fn evaluate_node(&mut self, idx: usize, mut path: PathValues) -> ChoiceResult<()> {
        let node = &mut self.nodes_mut()[idx];

        if let Some(tag) = &node.tag {
            path.values.insert(tag.name.clone(), tag.value);
            if let Some(p) = tag.prob {
                path.probabilities.insert(tag.name.clone(), p);
            }
            path.branches.insert(tag.name.clone(), tag.branch.clone());
        }

        match &node.kind {
            NodeKind::Terminal { payoff } => {
                let payoff = payoff.as_ref().ok_or_else(|| {
                    ChoiceError::Evaluation(format!(
                        "Terminal node {} ({}) has no payoff function",
                        idx, node.name
                    ))
                })?;
                let value = payoff.call(&path).map_err(|e| match e {
                    ChoiceError::Evaluation(msg) => ChoiceError::Evaluation(format!(
                        "Payoff of terminal node {} ({}) failed: {}",
                        idx, node.name, msg
                    )),
                    other => other,
                })?;
                if !value.is_finite() {
                    return Err(ChoiceError::Evaluation(format!(
                        "Payoff of terminal node {} ({}) is not finite: {}",
                        idx, node.name, value
                    )));
                }
                node.ev = Some(value);
                Ok(())
            }
            NodeKind::Decision { successors, .. } | NodeKind::Chance { successors, .. } => {
                let successors = successors.clone();
                for successor in successors {
                    self.evaluate_node(successor, path.clone())?;
                }
                Ok(())
            }
        }
    }
}

//! Backward induction.
//!
//! `rollback` runs three passes over an evaluated tree:
//!
//! 1. post-order values: chance nodes take the probability-weighted mean of
//!    their children, decision nodes the best child (EU under a utility
//!    transform, EV otherwise). Ties keep the earliest branch.
//! 2. optimal-strategy marking from the root.
//! 3. path probabilities along the optimal strategy.
//!
//! Forced branches replace the computed choice at both node types.

use tracing::debug;

use crate::error::{ChoiceError, ChoiceResult};
use crate::tree::{DecisionTree, NodeKind};
use crate::utility::{UtilityFn, View};

impl DecisionTree {
    /// Rolls the tree back and returns the root's EV, EU or CE.
    ///
    /// Without a utility function EU and CE are not computed and every view
    /// returns the root EV (identity utility).
    pub fn rollback(
        &mut self,
        view: View,
        utility: Option<UtilityFn>,
        risk_tolerance: f64,
    ) -> ChoiceResult<f64> {
        if utility.is_some() && !(risk_tolerance.is_finite() && risk_tolerance > 0.0) {
            return Err(ChoiceError::Configuration(format!(
                "Risk tolerance must be positive and finite, got {}",
                risk_tolerance
            )));
        }

        self.prepare_terminals(utility, risk_tolerance)?;
        self.rollback_node(0, utility.is_some())?;

        if let Some(f) = utility {
            for node in self.nodes_mut().iter_mut() {
                node.ce = node.eu.map(|eu| f.inverse(eu, risk_tolerance));
            }
        }

        self.mark_optimal_strategy(0, true);
        self.propagate_path_probability(0, 1.0);

        let root = self.root();
        let ev = root.ev.unwrap_or_default();
        let result = match (view, utility) {
            (View::Ev, _) | (_, None) => ev,
            (View::Eu, Some(_)) => root.eu.unwrap_or(ev),
            (View::Ce, Some(_)) => root.ce.unwrap_or(ev),
        };

        debug!(
            view = %view,
            utility = ?utility,
            risk_tolerance,
            result,
            "rollback complete"
        );
        Ok(result)
    }

    /// Plain expected-value rollback.
    pub fn rollback_ev(&mut self) -> ChoiceResult<f64> {
        self.rollback(View::Ev, None, 0.0)
    }

    /// String-identifier entry point: `view` is `"ev"`, `"eu"` or `"ce"`,
    /// `utility` is `None`, `"exp"` or `"log"`.
    pub fn rollback_with(
        &mut self,
        view: &str,
        utility: Option<&str>,
        risk_tolerance: f64,
    ) -> ChoiceResult<f64> {
        let view: View = view.parse()?;
        let utility = UtilityFn::parse_optional(utility)?;
        self.rollback(view, utility, risk_tolerance)
    }

    /// Computes terminal utilities, then resets internal results. Nothing is
    /// touched unless every terminal has a value inside the utility's domain.
    fn prepare_terminals(&mut self, utility: Option<UtilityFn>, risk_tolerance: f64) -> ChoiceResult<()> {
        let mut terminal_eu = Vec::new();
        for (idx, node) in self.nodes().iter().enumerate() {
            if !node.is_terminal() {
                continue;
            }
            let ev = node.ev.ok_or_else(|| {
                ChoiceError::Evaluation(format!(
                    "Terminal node {} ({}) has no value; call evaluate() before rollback()",
                    idx, node.name
                ))
            })?;
            let eu = match utility {
                Some(f) => Some(f.utility(ev, risk_tolerance)?),
                None => None,
            };
            terminal_eu.push((idx, eu));
        }

        for node in self.nodes_mut().iter_mut() {
            node.eu = None;
            node.ce = None;
            node.optimal_strategy = false;
            node.path_prob = None;

            match &mut node.kind {
                NodeKind::Terminal { .. } => {}
                NodeKind::Decision {
                    optimal_successor, ..
                }
                | NodeKind::Chance {
                    optimal_successor, ..
                } => {
                    *optimal_successor = None;
                    node.ev = None;
                }
            }
        }

        for (idx, eu) in terminal_eu {
            self.nodes_mut()[idx].eu = eu;
        }
        Ok(())
    }

    fn values_of(&self, idx: usize) -> ChoiceResult<(f64, Option<f64>)> {
        let node = &self.nodes()[idx];
        let ev = node.ev.ok_or_else(|| {
            ChoiceError::Evaluation(format!("Node {} ({}) has no expected value", idx, node.name))
        })?;
        Ok((ev, node.eu))
    }

    fn rollback_node(&mut self, idx: usize, use_eu: bool) -> ChoiceResult<()> {
        let (successors, forced) = match &self.nodes()[idx].kind {
            NodeKind::Terminal { .. } => return Ok(()),
            NodeKind::Decision {
                successors,
                forced_branch,
                ..
            }
            | NodeKind::Chance {
                successors,
                forced_branch,
                ..
            } => (successors.clone(), *forced_branch),
        };

        for &successor in &successors {
            self.rollback_node(successor, use_eu)?;
        }

        let is_decision = matches!(self.nodes()[idx].kind, NodeKind::Decision { .. });
        let (ev, eu, chosen) = match forced {
            Some(branch) => {
                let chosen = successors[branch];
                let (ev, eu) = self.values_of(chosen)?;
                (ev, eu, Some(chosen))
            }
            None if is_decision => {
                let maximize = matches!(
                    self.nodes()[idx].kind,
                    NodeKind::Decision { maximize: true, .. }
                );
                let chosen = self.select_successor(&successors, maximize, use_eu)?;
                let (ev, eu) = self.values_of(chosen)?;
                (ev, eu, Some(chosen))
            }
            None => {
                let mut ev = 0.0;
                let mut eu = 0.0;
                for &successor in &successors {
                    let prob = self.nodes()[successor].tag_prob().unwrap_or(0.0);
                    let (s_ev, s_eu) = self.values_of(successor)?;
                    ev += prob * s_ev;
                    eu += prob * s_eu.unwrap_or(0.0);
                }
                (ev, use_eu.then_some(eu), None)
            }
        };

        let node = &mut self.nodes_mut()[idx];
        node.ev = Some(ev);
        node.eu = if use_eu { eu } else { None };
        match &mut node.kind {
            NodeKind::Decision {
                optimal_successor, ..
            }
            | NodeKind::Chance {
                optimal_successor, ..
            } => *optimal_successor = chosen,
            NodeKind::Terminal { .. } => {}
        }
        Ok(())
    }

    /// First successor is the incumbent; a later one replaces it only on a
    /// strict improvement.
    fn select_successor(&self, successors: &[usize], maximize: bool, use_eu: bool) -> ChoiceResult<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &successor in successors {
            let (ev, eu) = self.values_of(successor)?;
            let criterion = if use_eu { eu.unwrap_or(ev) } else { ev };
            let better = match best {
                None => true,
                Some((_, incumbent)) if maximize => criterion > incumbent,
                Some((_, incumbent)) => criterion < incumbent,
            };
            if better {
                best = Some((successor, criterion));
            }
        }
        best.map(|(s, _)| s).ok_or_else(|| {
            ChoiceError::Evaluation("Decision node has no successors".to_string())
        })
    }

    fn mark_optimal_strategy(&mut self, idx: usize, on_path: bool) {
        self.nodes_mut()[idx].optimal_strategy = on_path;

        let node = &self.nodes()[idx];
        let successors = node.successors().to_vec();
        let selected = match &node.kind {
            NodeKind::Decision {
                optimal_successor, ..
            } => *optimal_successor,
            NodeKind::Chance { forced_branch, .. } => forced_branch.map(|b| successors[b]),
            NodeKind::Terminal { .. } => return,
        };

        for successor in successors {
            let child_on_path = match selected {
                Some(s) => on_path && s == successor,
                None => on_path,
            };
            self.mark_optimal_strategy(successor, child_on_path);
        }
    }

    /// `reach` is the probability of arriving at `idx` under the optimal
    /// strategy. Decision successors and forced chance successors are reached
    /// with conditional probability 1 (chosen) or 0; free chance successors
    /// with their branch probability.
    fn propagate_path_probability(&mut self, idx: usize, reach: f64) {
        self.nodes_mut()[idx].path_prob = Some(reach);

        let node = &self.nodes()[idx];
        let successors = node.successors().to_vec();
        let selected = match &node.kind {
            NodeKind::Terminal { .. } => return,
            NodeKind::Decision {
                optimal_successor, ..
            } => *optimal_successor,
            NodeKind::Chance { forced_branch, .. } => forced_branch.map(|b| successors[b]),
        };

        for successor in successors {
            let conditional = match selected {
                Some(s) if s == successor => 1.0,
                Some(_) => 0.0,
                None => self.nodes()[successor].tag_prob().unwrap_or(0.0),
            };
            self.propagate_path_probability(successor, reach * conditional);
        }
    }
}

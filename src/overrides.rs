//! Dependent probabilities and outcomes.
//!
//! Each override is applied with one traversal from the root that carries
//! the branch chosen for every ancestor variable. A node is overwritten when
//! that accumulated path contains every `variable = branch` pair of the
//! override's conditions. Overrides run in insertion order, so a later one
//! wins when two target the same node.

use std::collections::BTreeMap;

use tracing::debug;

use crate::nodes::Conditions;
use crate::tree::DecisionTree;

#[derive(Debug, Clone, Copy)]
enum Target {
    Probability(f64),
    Outcome(f64),
}

fn matches(conditions: &Conditions, path: &BTreeMap<String, String>) -> bool {
    conditions
        .iter()
        .all(|(name, branch)| path.get(name).map_or(false, |b| b == branch))
}

impl DecisionTree {
    pub(crate) fn apply_overrides(&mut self) {
        let probabilities: Vec<(Target, Conditions)> = self
            .bag()
            .dependent_probabilities()
            .iter()
            .map(|o| (Target::Probability(o.probability), o.conditions.clone()))
            .collect();
        let outcomes: Vec<(Target, Conditions)> = self
            .bag()
            .dependent_outcomes()
            .iter()
            .map(|o| (Target::Outcome(o.outcome), o.conditions.clone()))
            .collect();

        for (target, conditions) in probabilities.iter().chain(outcomes.iter()) {
            let changed = self.apply_override(*target, conditions, 0, BTreeMap::new());
            debug!(?target, ?conditions, changed, "override applied");
        }
    }

    fn apply_override(
        &mut self,
        target: Target,
        conditions: &Conditions,
        idx: usize,
        mut path: BTreeMap<String, String>,
    ) -> usize {
        let mut changed = 0;
        let node = &mut self.nodes_mut()[idx];

        if let Some(tag) = node.tag.as_mut() {
            path.insert(tag.name.clone(), tag.branch.clone());

            if matches(conditions, &path) {
                match target {
                    // Only chance branches carry a probability.
                    Target::Probability(p) => {
                        if tag.prob.is_some() {
                            tag.prob = Some(p);
                            changed += 1;
                        }
                    }
                    Target::Outcome(v) => {
                        tag.value = v;
                        changed += 1;
                    }
                }
            }
        }

        let successors = node.successors().to_vec();
        for successor in successors {
            changed += self.apply_override(target, conditions, successor, path.clone());
        }
        changed
    }
}

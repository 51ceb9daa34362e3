//! Decision tree arena.
//!
//! A `DecisionTree` expands the named node graph of a [`NodeSpecBag`] into a
//! flat vector of [`TreeNode`] records addressed by index (index 0 = root).
//! A name reached along several paths is expanded once per path, so every
//! record has exactly one parent and carries the branch it was reached by.
//!
//! Lifecycle: `new` (build + overrides) → `evaluate` (terminal payoffs) →
//! `rollback` (backward induction). Cloning yields a fully independent tree.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{ChoiceError, ChoiceResult};
use crate::nodes::{NodeSpec, NodeSpecBag};
use crate::payoff::PayoffFn;

// ---------------------------------------------------------------------------
// Node records
// ---------------------------------------------------------------------------

/// Metadata inherited from the branch leading into a node.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchTag {
    /// Name of the parent variable.
    pub name: String,
    /// Label of the parent branch.
    pub branch: String,
    /// Value of the parent branch (override-able).
    pub value: f64,
    /// Probability of the parent branch; only set below chance nodes.
    pub prob: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Decision {
        successors: Vec<usize>,
        maximize: bool,
        forced_branch: Option<usize>,
        optimal_successor: Option<usize>,
    },
    Chance {
        successors: Vec<usize>,
        forced_branch: Option<usize>,
        /// Only set when the node is forced.
        optimal_successor: Option<usize>,
    },
    Terminal {
        payoff: Option<PayoffFn>,
    },
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    /// `None` only for the root.
    pub tag: Option<BranchTag>,
    pub ev: Option<f64>,
    pub eu: Option<f64>,
    pub ce: Option<f64>,
    pub optimal_strategy: bool,
    pub path_prob: Option<f64>,
}

impl TreeNode {
    fn new(name: &str, kind: NodeKind, tag: Option<BranchTag>) -> Self {
        TreeNode {
            name: name.to_string(),
            kind,
            tag,
            ev: None,
            eu: None,
            ce: None,
            optimal_strategy: false,
            path_prob: None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self.kind {
            NodeKind::Decision { .. } => "DECISION",
            NodeKind::Chance { .. } => "CHANCE",
            NodeKind::Terminal { .. } => "TERMINAL",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal { .. })
    }

    pub fn successors(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Decision { successors, .. } | NodeKind::Chance { successors, .. } => {
                successors
            }
            NodeKind::Terminal { .. } => &[],
        }
    }

    pub fn forced_branch(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Decision { forced_branch, .. } | NodeKind::Chance { forced_branch, .. } => {
                forced_branch
            }
            NodeKind::Terminal { .. } => None,
        }
    }

    pub fn optimal_successor(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Decision {
                optimal_successor, ..
            }
            | NodeKind::Chance {
                optimal_successor, ..
            } => optimal_successor,
            NodeKind::Terminal { .. } => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_ref().map(|t| t.name.as_str())
    }

    pub fn tag_branch(&self) -> Option<&str> {
        self.tag.as_ref().map(|t| t.branch.as_str())
    }

    pub fn tag_value(&self) -> Option<f64> {
        self.tag.as_ref().map(|t| t.value)
    }

    pub fn tag_prob(&self) -> Option<f64> {
        self.tag.as_ref().and_then(|t| t.prob)
    }

    /// True when the node was reached through `branch` of variable `name`.
    pub fn is_tagged(&self, name: &str, branch: &str) -> bool {
        self.tag
            .as_ref()
            .map_or(false, |t| t.name == name && t.branch == branch)
    }

    fn clear_results(&mut self) {
        self.ev = None;
        self.eu = None;
        self.ce = None;
        self.optimal_strategy = false;
        self.path_prob = None;
        match &mut self.kind {
            NodeKind::Decision {
                optimal_successor, ..
            }
            | NodeKind::Chance {
                optimal_successor, ..
            } => *optimal_successor = None,
            NodeKind::Terminal { .. } => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DecisionTree {
    bag: NodeSpecBag,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Copies `bag` and expands it into a tree rooted at its first name.
    pub fn new(bag: &NodeSpecBag) -> ChoiceResult<Self> {
        let mut tree = DecisionTree {
            bag: bag.clone(),
            nodes: Vec::new(),
        };
        tree.rebuild()?;
        Ok(tree)
    }

    pub fn bag(&self) -> &NodeSpecBag {
        &self.bag
    }

    /// Mutable access to the specification. Call [`rebuild`](Self::rebuild)
    /// afterwards to regenerate the tree.
    pub fn bag_mut(&mut self) -> &mut NodeSpecBag {
        &mut self.bag
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn root_name(&self) -> &str {
        &self.root().name
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [TreeNode] {
        &mut self.nodes
    }

    pub(crate) fn checked_node(&self, idx: usize) -> ChoiceResult<&TreeNode> {
        self.nodes.get(idx).ok_or_else(|| {
            ChoiceError::Configuration(format!(
                "Node index {} out of range (tree has {} nodes)",
                idx,
                self.nodes.len()
            ))
        })
    }

    /// Indices of the nodes on the optimal strategy after a rollback.
    pub fn optimal_path(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.optimal_strategy)
            .map(|(i, _)| i)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Regenerates the tree from the current specification: expands the
    /// skeleton, tags every node with its incoming branch, binds payoffs and
    /// applies the dependent probabilities and outcomes. Results and forced
    /// branches from a previous build are discarded.
    pub fn rebuild(&mut self) -> ChoiceResult<()> {
        let root = self
            .bag
            .root_name()
            .ok_or_else(|| ChoiceError::Validation("Node specification is empty".to_string()))?
            .to_string();

        self.check_graph(&root)?;
        self.check_override_conditions()?;

        self.nodes.clear();
        self.expand(&root, None);
        self.apply_overrides();

        info!(root = %root, nodes = self.nodes.len(), "tree rebuilt");
        Ok(())
    }

    /// Rejects successor names missing from the bag and cycles reachable
    /// from the root, either of which would make expansion diverge.
    fn check_graph(&self, root: &str) -> ChoiceResult<()> {
        fn visit<'a>(
            bag: &'a NodeSpecBag,
            name: &'a str,
            stack: &mut Vec<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> ChoiceResult<()> {
            if done.contains(name) {
                return Ok(());
            }
            if stack.contains(&name) {
                return Err(ChoiceError::Validation(format!(
                    "Cycle in node graph: {} -> {}",
                    stack.join(" -> "),
                    name
                )));
            }
            let spec = bag.get(name).ok_or_else(|| {
                let parent = stack.last().copied().unwrap_or("<root>");
                ChoiceError::Validation(format!(
                    "Variable {} refers to unknown node {}",
                    parent, name
                ))
            })?;
            stack.push(name);
            for next in spec.successor_names() {
                visit(bag, next, stack, done)?;
            }
            stack.pop();
            done.insert(name);
            Ok(())
        }

        visit(&self.bag, root, &mut Vec::new(), &mut HashSet::new())
    }

    fn check_override_conditions(&self) -> ChoiceResult<()> {
        let conditions = self
            .bag
            .dependent_probabilities()
            .iter()
            .map(|o| &o.conditions)
            .chain(self.bag.dependent_outcomes().iter().map(|o| &o.conditions));

        for condition in conditions {
            for (name, label) in condition {
                let spec = self.bag.get(name).ok_or_else(|| {
                    ChoiceError::Configuration(format!(
                        "Override condition refers to unknown variable {}",
                        name
                    ))
                })?;
                if !spec.branch_values().iter().any(|(l, _)| *l == label.as_str()) {
                    return Err(ChoiceError::Configuration(format!(
                        "Override condition {}={} names an unknown branch",
                        name, label
                    )));
                }
            }
        }
        Ok(())
    }

    /// Allocates a record for `name` and recursively one per branch below it.
    fn expand(&mut self, name: &str, tag: Option<BranchTag>) -> usize {
        let idx = self.nodes.len();
        // check_graph guarantees every reachable name exists.
        let spec = self.bag.get(name).cloned().unwrap_or(NodeSpec::Terminal { payoff: None });

        match spec {
            NodeSpec::Terminal { payoff } => {
                self.nodes.push(TreeNode::new(name, NodeKind::Terminal { payoff }, tag));
            }
            NodeSpec::Decision { branches, maximize } => {
                self.nodes.push(TreeNode::new(
                    name,
                    NodeKind::Decision {
                        successors: Vec::with_capacity(branches.len()),
                        maximize,
                        forced_branch: None,
                        optimal_successor: None,
                    },
                    tag,
                ));
                for branch in &branches {
                    let child_tag = BranchTag {
                        name: name.to_string(),
                        branch: branch.label.clone(),
                        value: branch.value,
                        prob: None,
                    };
                    let child = self.expand(&branch.next, Some(child_tag));
                    self.push_successor(idx, child);
                }
            }
            NodeSpec::Chance { branches } => {
                self.nodes.push(TreeNode::new(
                    name,
                    NodeKind::Chance {
                        successors: Vec::with_capacity(branches.len()),
                        forced_branch: None,
                        optimal_successor: None,
                    },
                    tag,
                ));
                for branch in &branches {
                    let child_tag = BranchTag {
                        name: name.to_string(),
                        branch: branch.label.clone(),
                        value: branch.value,
                        prob: Some(branch.probability),
                    };
                    let child = self.expand(&branch.next, Some(child_tag));
                    self.push_successor(idx, child);
                }
            }
        }
        idx
    }

    fn push_successor(&mut self, parent: usize, child: usize) {
        match &mut self.nodes[parent].kind {
            NodeKind::Decision { successors, .. } | NodeKind::Chance { successors, .. } => {
                successors.push(child)
            }
            NodeKind::Terminal { .. } => {}
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Pins (`Some(branch)`) or releases (`None`) the rollback choice of a
    /// decision or chance node. `branch` indexes the node's branch list.
    pub fn force_branch(&mut self, idx: usize, branch: Option<usize>) -> ChoiceResult<()> {
        let node = self.checked_node(idx)?;
        let n_successors = node.successors().len();
        if let Some(b) = branch {
            if b >= n_successors {
                return Err(ChoiceError::Configuration(format!(
                    "Forced branch {} out of range for node {} ({} branches)",
                    b, idx, n_successors
                )));
            }
        }
        match &mut self.nodes[idx].kind {
            NodeKind::Decision { forced_branch, .. } | NodeKind::Chance { forced_branch, .. } => {
                *forced_branch = branch;
                Ok(())
            }
            NodeKind::Terminal { .. } => Err(ChoiceError::Configuration(format!(
                "Node {} is a terminal and has no branches to force",
                idx
            ))),
        }
    }

    /// Overwrites the value of every occurrence of branch `branch` of
    /// variable `name`. Returns the number of nodes changed.
    pub fn set_tag_value(&mut self, name: &str, branch: &str, value: f64) -> usize {
        let mut changed = 0;
        for node in self.nodes.iter_mut().filter(|n| n.is_tagged(name, branch)) {
            if let Some(tag) = node.tag.as_mut() {
                tag.value = value;
                changed += 1;
            }
        }
        changed
    }

    /// Overwrites the probability of every occurrence of chance branch
    /// `branch` of variable `name`. Returns the number of nodes changed.
    pub fn set_tag_probability(&mut self, name: &str, branch: &str, probability: f64) -> usize {
        let mut changed = 0;
        for node in self.nodes.iter_mut().filter(|n| n.is_tagged(name, branch)) {
            if let Some(tag) = node.tag.as_mut().filter(|t| t.prob.is_some()) {
                tag.prob = Some(probability);
                changed += 1;
            }
        }
        changed
    }

    /// Sets the probability of every branch of chance variable `name` to zero.
    pub fn zero_probabilities(&mut self, name: &str) -> usize {
        let mut changed = 0;
        for node in self.nodes.iter_mut() {
            if let Some(tag) = node.tag.as_mut().filter(|t| t.name == name && t.prob.is_some()) {
                tag.prob = Some(0.0);
                changed += 1;
            }
        }
        debug!(variable = name, changed, "branch probabilities zeroed");
        changed
    }

    pub(crate) fn clear_results(&mut self) {
        for node in self.nodes.iter_mut() {
            node.clear_results();
        }
    }
}

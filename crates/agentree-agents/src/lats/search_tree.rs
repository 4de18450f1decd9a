// ABOUTME: Search tree data structure for LATS algorithm
// ABOUTME: Arena of trajectory nodes with UCT scoring, pruning selection and backpropagation

use crate::trajectory::StepRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type NodeId = usize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchTreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid node operation: {0}")]
    InvalidOperation(String),
}

/// One reasoning state in the search tree.
///
/// `parent` is a back-reference used for upward walks only; the node is owned
/// through its parent's `children` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub state: StepRecord,
    pub visits: u32,
    pub value: f64,
    pub depth: usize,
    pub is_terminal: bool,
    pub reward: f64,
}

impl TrajectoryNode {
    /// Terminal with full reward; reaching one halts the search
    pub fn is_solution(&self) -> bool {
        self.is_terminal && self.reward == 1.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTree {
    nodes: Vec<TrajectoryNode>,
    root_id: NodeId,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    /// Tree with a blank root at depth 0
    pub fn new() -> Self {
        Self::with_root_depth(0)
    }

    /// Tree whose root starts at an externally supplied depth
    pub fn with_root_depth(depth: usize) -> Self {
        let root = TrajectoryNode {
            id: 0,
            parent: None,
            children: Vec::new(),
            state: StepRecord::default(),
            visits: 0,
            value: 0.0,
            depth,
            is_terminal: false,
            reward: 0.0,
        };

        Self {
            nodes: vec![root],
            root_id: 0,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Nodes ever created, including pruned ones
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node(&self, id: NodeId) -> Result<&TrajectoryNode, SearchTreeError> {
        self.nodes.get(id).ok_or(SearchTreeError::NodeNotFound(id))
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Result<&mut TrajectoryNode, SearchTreeError> {
        self.nodes.get_mut(id).ok_or(SearchTreeError::NodeNotFound(id))
    }

    pub fn get_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Allocate a node under `parent` without attaching it yet.
    ///
    /// The node's depth is fixed here from the parent's; attach it with
    /// [`SearchTree::add_children`] once its outcome is known.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        state: StepRecord,
    ) -> Result<NodeId, SearchTreeError> {
        let parent_depth = self.get_node(parent)?.depth;
        let id = self.nodes.len();

        self.nodes.push(TrajectoryNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            state,
            visits: 0,
            value: 0.0,
            depth: parent_depth + 1,
            is_terminal: false,
            reward: 0.0,
        });

        Ok(id)
    }

    /// Append `children` to `parent`, preserving order.
    ///
    /// Every child must have been created under `parent` and not be attached yet.
    pub fn add_children(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
    ) -> Result<(), SearchTreeError> {
        self.get_node(parent)?;
        for &child in children {
            let node = self.get_node(child)?;
            if node.parent != Some(parent) {
                return Err(SearchTreeError::InvalidOperation(format!(
                    "node {} was created under {:?}, not {}",
                    child, node.parent, parent
                )));
            }
            if self.nodes[parent].children.contains(&child) {
                return Err(SearchTreeError::InvalidOperation(format!(
                    "node {} is already a child of {}",
                    child, parent
                )));
            }
            self.nodes[parent].children.push(child);
        }
        Ok(())
    }

    /// Detach `child` from `parent`'s child list; its subtree becomes unreachable
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.nodes.get_mut(parent) {
            Some(node) => {
                let before = node.children.len();
                node.children.retain(|&c| c != child);
                node.children.len() != before
            }
            None => false,
        }
    }

    pub fn mark_terminal(&mut self, id: NodeId) -> Result<(), SearchTreeError> {
        self.get_node_mut(id)?.is_terminal = true;
        Ok(())
    }

    /// Upper Confidence Bound for Trees.
    ///
    /// Falls back to the raw value while the node or its parent is unvisited,
    /// or for the root.
    pub fn uct(&self, id: NodeId) -> f64 {
        let node = match self.nodes.get(id) {
            Some(n) => n,
            None => return f64::NEG_INFINITY,
        };
        let parent_visits = node
            .parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.visits)
            .unwrap_or(0);

        if node.visits == 0 || parent_visits == 0 {
            return node.value;
        }

        let visits = node.visits as f64;
        node.value / visits + (2.0 * (parent_visits as f64).ln() / visits).sqrt()
    }

    /// Walk from the root to the node to expand next.
    ///
    /// Descends by UCT over non-terminal children (first maximum wins). A node
    /// whose children are all terminal is detached from its parent and the walk
    /// resumes there. Returns the root itself once everything under it is
    /// exhausted.
    pub fn select(&mut self) -> NodeId {
        let mut current = self.root_id;

        loop {
            let node = &self.nodes[current];
            if node.children.is_empty() {
                return current;
            }

            let candidates: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|&c| !self.nodes[c].is_terminal)
                .collect();

            if candidates.is_empty() {
                let parent = node.parent;
                match parent {
                    Some(parent) => {
                        self.remove_child(parent, current);
                        current = parent;
                        continue;
                    }
                    None => return current,
                }
            }

            current = self.first_max_by(&candidates, |tree, id| tree.uct(id));
        }
    }

    /// First child with the highest value, if any
    pub fn best_child_by_value(&self, id: NodeId) -> Option<NodeId> {
        let children = self.children(id);
        if children.is_empty() {
            return None;
        }
        Some(self.first_max_by(children, |tree, c| tree.nodes[c].value))
    }

    /// Terminal child with the highest reward, first on ties
    pub fn best_terminal_child(&self, id: NodeId) -> Option<NodeId> {
        let terminal: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_terminal)
            .collect();
        if terminal.is_empty() {
            return None;
        }
        Some(self.first_max_by(&terminal, |tree, c| tree.nodes[c].reward))
    }

    fn first_max_by(&self, ids: &[NodeId], score: impl Fn(&Self, NodeId) -> f64) -> NodeId {
        let mut best = ids[0];
        let mut best_score = score(self, best);
        for &id in &ids[1..] {
            let s = score(self, id);
            if s > best_score {
                best = id;
                best_score = s;
            }
        }
        best
    }

    /// Update statistics from `id` up to the root.
    ///
    /// Each node on the path gains one visit and blends `value` into its running
    /// mean, except failed terminals, which always blend in -1.
    pub fn backpropagate(&mut self, id: NodeId, value: f64) -> Result<(), SearchTreeError> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get_node_mut(node_id)?;
            node.visits += 1;
            let x = if node.is_terminal && node.reward == 0.0 {
                -1.0
            } else {
                value
            };
            let visits = node.visits as f64;
            node.value = (node.value * (visits - 1.0) + x) / visits;
            current = node.parent;
        }
        Ok(())
    }

    /// Node ids from the root down to `id`
    pub fn path_to(&self, id: NodeId) -> Result<Vec<NodeId>, SearchTreeError> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            path.push(node_id);
            current = self.get_node(node_id)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// 1-based step number `id` represents relative to the root
    pub fn step_of(&self, id: NodeId) -> Result<usize, SearchTreeError> {
        let root_depth = self.nodes[self.root_id].depth;
        Ok(self.get_node(id)?.depth.saturating_sub(root_depth))
    }

    /// Thought/Action/Observation rendering of the trajectory ending at `id`
    pub fn scratchpad(&self, id: NodeId) -> Result<String, SearchTreeError> {
        let mut scratchpad = String::new();
        for node_id in self.path_to(id)? {
            if node_id == self.root_id {
                continue;
            }
            let step = self.step_of(node_id)?;
            scratchpad.push_str(&self.nodes[node_id].state.render(step));
        }
        Ok(scratchpad)
    }
}

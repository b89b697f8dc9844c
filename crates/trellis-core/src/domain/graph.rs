//! Task graph: nodes with execution state plus their dependencies.
//!
//! Design:
//! - Forward edges: node -> nodes that consume its output (children)
//! - Reverse edges: node -> nodes it depends on (parents)
//! - Invariant: edges and reverse edges are kept in sync
//! - Invariant: every id in `dirty_nodes` exists in `nodes`

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DispatchId, NodeId};
use super::record::DispatchRecord;
use super::result::NodeResult;
use super::status::NodeStatus;

/// A single task in a task graph together with its latest execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,

    /// Serialized callable / inputs of the task.
    #[serde(default)]
    pub payload: serde_json::Value,

    pub status: NodeStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    /// Set when this node invoked a sub-workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_dispatch_id: Option<DispatchId>,

    /// Final record of the sub-workflow, kept so the parent can inspect it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice: Option<Box<DispatchRecord>>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id,
            name: name.into(),
            payload,
            status: NodeStatus::New,
            start_time: None,
            end_time: None,
            output: None,
            error: None,
            stdout: None,
            stderr: None,
            sub_dispatch_id: None,
            sublattice: None,
        }
    }

    /// Reset execution state, keeping identity and payload.
    pub fn reset(&mut self) {
        self.status = NodeStatus::New;
        self.start_time = None;
        self.end_time = None;
        self.output = None;
        self.error = None;
        self.stdout = None;
        self.stderr = None;
        self.sub_dispatch_id = None;
        self.sublattice = None;
    }

    /// Copy the computed result of `other` onto this node.
    pub fn copy_result_from(&mut self, other: &Node) {
        self.status = other.status;
        self.start_time = other.start_time;
        self.end_time = other.end_time;
        self.output = other.output.clone();
        self.error = other.error.clone();
        self.stdout = other.stdout.clone();
        self.stderr = other.stderr.clone();
        self.sub_dispatch_id = other.sub_dispatch_id;
        self.sublattice = other.sublattice.clone();
    }

    /// Merge a node result. Absent fields leave the current value untouched.
    pub fn apply(&mut self, result: &NodeResult) {
        if let Some(status) = result.status {
            self.status = status;
        }
        if let Some(start_time) = result.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = result.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(output) = &result.output {
            self.output = Some(output.clone());
        }
        if let Some(error) = &result.error {
            self.error = Some(error.clone());
        }
        if let Some(stdout) = &result.stdout {
            self.stdout = Some(stdout.clone());
        }
        if let Some(stderr) = &result.stderr {
            self.stderr = Some(stderr.clone());
        }
        if let Some(sub_dispatch_id) = result.sub_dispatch_id {
            self.sub_dispatch_id = Some(sub_dispatch_id);
        }
        if let Some(sublattice) = &result.sublattice {
            self.sublattice = Some(sublattice.clone());
        }
    }
}

/// Task graph of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    nodes: BTreeMap<NodeId, Node>,

    /// Forward edges: node -> its children.
    edges: BTreeMap<NodeId, BTreeSet<NodeId>>,

    /// Reverse edges: node -> its parents.
    reverse_edges: BTreeMap<NodeId, BTreeSet<NodeId>>,

    dirty_nodes: BTreeSet<NodeId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns false if the id is already taken.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Add a dependency: `child` consumes the output of `parent`.
    ///
    /// Both ends must already exist. Returns false otherwise.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return false;
        }
        self.edges.entry(parent).or_default().insert(child);
        self.reverse_edges.entry(child).or_default().insert(parent);
        true
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parents(&self, node_id: NodeId) -> Vec<NodeId> {
        self.reverse_edges
            .get(&node_id)
            .map(|parents| parents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.edges
            .get(&node_id)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every node reachable from `roots` through forward edges, roots included.
    pub fn descendants<I>(&self, roots: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut reached = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = roots
            .into_iter()
            .filter(|id| self.nodes.contains_key(id))
            .collect();

        while let Some(current) = queue.pop_front() {
            if !reached.insert(current) {
                continue;
            }
            queue.extend(self.children(current));
        }
        reached
    }

    /// Nodes in dependency order (Kahn's algorithm), or `None` if the graph
    /// has a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: BTreeMap<NodeId, usize> = self
            .nodes
            .keys()
            .map(|id| (*id, self.reverse_edges.get(id).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = ready.pop_front() {
            order.push(node_id);
            for child in self.children(node_id) {
                if let Some(degree) = in_degree.get_mut(&child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(child);
                    }
                }
            }
        }

        (order.len() == self.nodes.len()).then_some(order)
    }

    /// Reset every node to NEW with empty timestamps, output and error.
    pub fn initialize_nodes(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
    }

    pub fn dirty_nodes(&self) -> &BTreeSet<NodeId> {
        &self.dirty_nodes
    }

    /// Replace the dirty set. Ids not present in the graph are dropped.
    pub fn set_dirty<I>(&mut self, node_ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.dirty_nodes = node_ids
            .into_iter()
            .filter(|id| self.nodes.contains_key(id))
            .collect();
    }

    /// Mark every node dirty.
    pub fn mark_all_dirty(&mut self) {
        self.dirty_nodes = self.nodes.keys().copied().collect();
    }

    /// Count nodes per status.
    pub fn counts_by_status(&self) -> NodeCounts {
        let mut counts = NodeCounts::default();
        for node in self.nodes.values() {
            match node.status {
                NodeStatus::New => counts.new += 1,
                NodeStatus::Running => counts.running += 1,
                NodeStatus::Completed => counts.completed += 1,
                NodeStatus::Failed => counts.failed += 1,
                NodeStatus::Cancelled => counts.cancelled += 1,
                NodeStatus::PostprocessingFailed => counts.postprocessing_failed += 1,
            }
        }
        counts
    }
}

/// Per-status node tally of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    pub new: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub postprocessing_failed: usize,
}

impl NodeCounts {
    pub fn total(&self) -> usize {
        self.new
            + self.running
            + self.completed
            + self.failed
            + self.cancelled
            + self.postprocessing_failed
    }
}

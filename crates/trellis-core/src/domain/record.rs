//! Dispatch record: one execution instance of a workflow graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::{NodeCounts, TaskGraph};
use super::ids::{DispatchId, ElectronRef, NodeId};
use super::status::DispatchStatus;

/// A decoded workflow: its name and task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub graph: TaskGraph,
}

impl Workflow {
    pub fn new(name: impl Into<String>, graph: TaskGraph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }
}

/// Dispatch record.
///
/// Design:
/// - Created once (builder or differencer), registered once, mutated in place
///   by the node update pipeline, deregistered once.
/// - Dispatch-level status is tracked independently of node statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub dispatch_id: DispatchId,

    /// Top-level dispatch of a sub-workflow chain (own id for roots).
    pub root_dispatch_id: DispatchId,

    /// Spawning node in an ancestor dispatch (sub-dispatches only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_electron: Option<ElectronRef>,

    pub workflow: Workflow,

    pub status: DispatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Final result payload of the workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl DispatchRecord {
    /// Create a root dispatch record.
    pub fn new(dispatch_id: DispatchId, workflow: Workflow, created_at: DateTime<Utc>) -> Self {
        Self {
            dispatch_id,
            root_dispatch_id: dispatch_id,
            parent_electron: None,
            workflow,
            status: DispatchStatus::New,
            start_time: None,
            end_time: None,
            result: None,
            error: None,
            created_at,
        }
    }

    /// Link this record as a sub-dispatch of `parent_node_id` in `parent`.
    pub fn link_parent(&mut self, parent: &DispatchRecord, parent_node_id: NodeId) {
        self.root_dispatch_id = parent.root_dispatch_id;
        self.parent_electron = Some(ElectronRef::new(parent.dispatch_id, parent_node_id));
    }

    pub fn is_root(&self) -> bool {
        self.parent_electron.is_none()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.workflow.graph
    }

    pub fn graph_mut(&mut self) -> &mut TaskGraph {
        &mut self.workflow.graph
    }

    pub fn num_nodes(&self) -> usize {
        self.workflow.graph.len()
    }

    /// Reset every node to NEW.
    pub fn initialize_nodes(&mut self) {
        self.workflow.graph.initialize_nodes();
    }

    pub fn node_counts(&self) -> NodeCounts {
        self.workflow.graph.counts_by_status()
    }

    /// Mark the dispatch as running.
    pub fn mark_running(&mut self, at: DateTime<Utc>) {
        self.status = DispatchStatus::Running;
        self.start_time.get_or_insert(at);
    }

    /// Record a terminal outcome.
    pub fn mark_finished(
        &mut self,
        status: DispatchStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.result = result;
        self.error = error;
        self.end_time = Some(at);
    }
}

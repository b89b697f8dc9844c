//! Node result: the unit of update applied to a dispatch's task graph.
//!
//! The execution engine produces one per node transition; the sublattice
//! propagator synthesizes one for the spawning node of a finished
//! sub-dispatch. Absent fields mean "leave unchanged".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DispatchId, NodeId};
use super::record::DispatchRecord;
use super::status::NodeStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: NodeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// `None` means the update carries no status transition, so nothing is
    /// emitted on the status channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_dispatch_id: Option<DispatchId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice: Option<Box<DispatchRecord>>,
}

impl NodeResult {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            start_time: None,
            end_time: None,
            status: None,
            output: None,
            error: None,
            stdout: None,
            stderr: None,
            sub_dispatch_id: None,
            sublattice: None,
        }
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    /// Link this node to the sub-dispatch it spawned.
    pub fn with_sub_dispatch(mut self, sub_dispatch_id: DispatchId) -> Self {
        self.sub_dispatch_id = Some(sub_dispatch_id);
        self
    }

    /// Attach the finished sub-dispatch record (and its id).
    pub fn with_sublattice(mut self, record: DispatchRecord) -> Self {
        self.sub_dispatch_id = Some(record.dispatch_id);
        self.sublattice = Some(Box::new(record));
        self
    }
}

//! Serialized workflow definitions (Workflow / Task / Edge specs).
//!
//! This is the submission shape. It is decoded into a `Workflow` by a
//! `WorkflowCodec`, which also validates the graph structure. Open-ended
//! fields are kept as `serde_json::Value` so definitions can evolve without
//! breaking changes.

use serde::{Deserialize, Serialize};

use super::ids::NodeId;

/// A workflow definition: a named set of tasks and their dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,

    pub tasks: Vec<TaskSpec>,

    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// One task in a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: NodeId,

    /// Task name; also the key used by re-dispatch overrides.
    pub name: String,

    /// Serialized callable / inputs of the task.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskSpec {
    /// Task with a null payload.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            name: name.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A dependency: `target` consumes the output of `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: NodeId,
    pub target: NodeId,

    /// Parameter of `target` fed by this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl EdgeSpec {
    pub fn new(source: u32, target: u32) -> Self {
        Self {
            source: NodeId::new(source),
            target: NodeId::new(target),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }
}

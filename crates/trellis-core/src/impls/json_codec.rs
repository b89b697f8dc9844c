//! JsonWorkflowCodec - JSON の `WorkflowSpec` 定義をデコードする
//!
//! # 検証
//! - ノード id が一意
//! - すべてのエッジが存在するノードを指す
//! - グラフに循環がない

use crate::domain::errors::CodecError;
use crate::domain::graph::{Node, TaskGraph};
use crate::domain::record::Workflow;
use crate::domain::spec::WorkflowSpec;
use crate::ports::WorkflowCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWorkflowCodec;

impl JsonWorkflowCodec {
    pub fn new() -> Self {
        Self
    }

    /// パース済みの spec から workflow を組み立てる
    pub fn from_spec(&self, spec: WorkflowSpec) -> Result<Workflow, CodecError> {
        let mut graph = TaskGraph::new();
        for task in spec.tasks {
            let node_id = task.id;
            if !graph.add_node(Node::new(node_id, task.name, task.payload)) {
                return Err(CodecError::DuplicateNode(node_id));
            }
        }
        for edge in spec.edges {
            if !graph.add_edge(edge.source, edge.target) {
                return Err(CodecError::InvalidEdge {
                    from: edge.source,
                    to: edge.target,
                });
            }
        }
        if graph.topological_order().is_none() {
            return Err(CodecError::Cycle);
        }
        Ok(Workflow::new(spec.name, graph))
    }
}

impl WorkflowCodec for JsonWorkflowCodec {
    fn decode(&self, definition: &str) -> Result<Workflow, CodecError> {
        let spec: WorkflowSpec = serde_json::from_str(definition)?;
        self.from_spec(spec)
    }
}

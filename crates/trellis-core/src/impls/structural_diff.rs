//! StructuralDiff - デフォルトの `GraphDiff`
//!
//! 新しいグラフのノードが再利用できる条件：
//! - 古いグラフに同じ id・名前・payload のノードがある
//! - 親ノードの集合が同じで、古いノードが COMPLETED
//! - 親がすべて再利用可能
//!
//! 依存順にノードを訪れるので、親の判定が常に先に済んでいます。

use std::collections::BTreeSet;

use crate::domain::graph::TaskGraph;
use crate::domain::ids::NodeId;
use crate::domain::status::NodeStatus;
use crate::ports::GraphDiff;

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralDiff;

impl StructuralDiff {
    pub fn new() -> Self {
        Self
    }
}

impl GraphDiff for StructuralDiff {
    fn reusable_nodes(&self, old: &TaskGraph, new: &TaskGraph) -> Vec<NodeId> {
        let Some(order) = new.topological_order() else {
            return Vec::new();
        };

        let mut reusable = BTreeSet::new();
        for node_id in order {
            let (Some(candidate), Some(prior)) = (new.node(node_id), old.node(node_id)) else {
                continue;
            };
            if prior.status != NodeStatus::Completed
                || candidate.name != prior.name
                || candidate.payload != prior.payload
            {
                continue;
            }
            let parents = new.parents(node_id);
            if parents != old.parents(node_id) {
                continue;
            }
            if parents.iter().all(|parent| reusable.contains(parent)) {
                reusable.insert(node_id);
            }
        }
        reusable.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Node;
    use serde_json::json;

    /// 0 -> 1 -> 2 with payloads `p0`, `p1`, `p2`.
    fn chain() -> TaskGraph {
        let mut graph = TaskGraph::new();
        for id in 0..3 {
            graph.add_node(Node::new(NodeId::new(id), format!("t{id}"), json!(format!("p{id}"))));
        }
        graph.add_edge(NodeId::new(0), NodeId::new(1));
        graph.add_edge(NodeId::new(1), NodeId::new(2));
        graph
    }

    fn completed_chain() -> TaskGraph {
        let mut graph = chain();
        for node in graph.nodes_mut() {
            node.status = NodeStatus::Completed;
            node.output = Some(json!(node.id.get() * 10));
        }
        graph
    }

    #[test]
    fn identical_completed_graph_is_fully_reusable() {
        let reusable = StructuralDiff::new().reusable_nodes(&completed_chain(), &chain());
        assert_eq!(reusable, vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]);
    }

    #[test]
    fn changed_payload_invalidates_node_and_descendants() {
        let mut new = chain();
        new.node_mut(NodeId::new(1)).unwrap().payload = json!("changed");

        let reusable = StructuralDiff::new().reusable_nodes(&completed_chain(), &new);
        assert_eq!(reusable, vec![NodeId::new(0)]);
    }

    #[test]
    fn failed_prior_node_is_not_reusable() {
        let mut old = completed_chain();
        old.node_mut(NodeId::new(0)).unwrap().status = NodeStatus::Failed;

        let reusable = StructuralDiff::new().reusable_nodes(&old, &chain());
        assert!(reusable.is_empty());
    }

    #[test]
    fn new_node_is_not_reusable_but_siblings_are() {
        let mut new = chain();
        new.add_node(Node::new(NodeId::new(3), "t3", json!("p3")));
        new.add_edge(NodeId::new(0), NodeId::new(3));

        let reusable = StructuralDiff::new().reusable_nodes(&completed_chain(), &new);
        assert_eq!(reusable, vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]);
    }

    #[test]
    fn rewired_parent_is_not_reusable() {
        let mut new = TaskGraph::new();
        for id in 0..3 {
            new.add_node(Node::new(NodeId::new(id), format!("t{id}"), json!(format!("p{id}"))));
        }
        new.add_edge(NodeId::new(0), NodeId::new(1));
        new.add_edge(NodeId::new(0), NodeId::new(2));

        let reusable = StructuralDiff::new().reusable_nodes(&completed_chain(), &new);
        assert_eq!(reusable, vec![NodeId::new(0), NodeId::new(1)]);
    }

    #[test]
    fn copy_nodes_carries_results_over() {
        let old = completed_chain();
        let mut new = chain();
        let diff = StructuralDiff::new();

        diff.copy_nodes(&old, &mut new, &[NodeId::new(0), NodeId::new(9)]);

        let copied = new.node(NodeId::new(0)).unwrap();
        assert_eq!(copied.status, NodeStatus::Completed);
        assert_eq!(copied.output, Some(json!(0)));
        assert_eq!(new.node(NodeId::new(1)).unwrap().status, NodeStatus::New);
    }
}

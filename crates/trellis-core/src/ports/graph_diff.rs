//! GraphDiff port - 2 つのタスクグラフの構造比較
//!
//! 再 dispatch で、計算済みのノードのうちどれを新しいグラフへ
//! 引き継げるかを決めるために使います。

use crate::domain::graph::TaskGraph;
use crate::domain::ids::NodeId;

/// GraphDiff は新しいグラフでも以前の結果が有効なノードを見つける
pub trait GraphDiff: Send + Sync {
    /// `old` の結果をそのまま使える `new` のノード id
    fn reusable_nodes(&self, old: &TaskGraph, new: &TaskGraph) -> Vec<NodeId>;

    /// `node_ids` の計算結果を `from` から `to` へコピーする
    ///
    /// どちらかに存在しない id は飛ばします。
    fn copy_nodes(&self, from: &TaskGraph, to: &mut TaskGraph, node_ids: &[NodeId]) {
        for node_id in node_ids {
            if let (Some(source), Some(target)) = (from.node(*node_id), to.node_mut(*node_id)) {
                target.copy_result_from(source);
            }
        }
    }
}

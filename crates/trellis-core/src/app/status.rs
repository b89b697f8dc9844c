//! Status views - 稼働中 dispatch の読み取り専用スナップショット

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::manager::DispatchManager;
use crate::domain::errors::DispatchError;
use crate::domain::graph::NodeCounts;
use crate::domain::ids::{DispatchId, NodeId};
use crate::domain::status::DispatchStatus;

/// 稼働中 dispatch 1 件の要約
///
/// - `finished`: dispatch 自身が終端状態か
/// - `pending`: まだ終端状態に達していないノード数
///
/// # 使用例
/// ```ignore
/// let summary = manager.summary(dispatch_id).await?;
/// println!("{}: {:?} ({} dirty)", summary.name, summary.status, summary.dirty.len());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub dispatch_id: DispatchId,
    pub root_dispatch_id: DispatchId,
    pub name: String,
    pub status: DispatchStatus,
    pub finished: bool,
    pub counts: NodeCounts,
    pub pending: usize,
    pub dirty: Vec<NodeId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl DispatchManager {
    /// 稼働中 dispatch のノードを状態ごとに数える
    pub async fn node_counts(&self, dispatch_id: DispatchId) -> Result<NodeCounts, DispatchError> {
        let handle = self.registry.get(dispatch_id)?;
        let record = handle.lock().await;
        Ok(record.node_counts())
    }

    pub async fn summary(&self, dispatch_id: DispatchId) -> Result<DispatchSummary, DispatchError> {
        let handle = self.registry.get(dispatch_id)?;
        let record = handle.lock().await;
        Ok(DispatchSummary {
            dispatch_id: record.dispatch_id,
            root_dispatch_id: record.root_dispatch_id,
            name: record.workflow.name.clone(),
            status: record.status,
            finished: record.status.is_terminal(),
            counts: record.node_counts(),
            pending: record
                .graph()
                .nodes()
                .filter(|node| !node.status.is_terminal())
                .count(),
            dirty: record.graph().dirty_nodes().iter().copied().collect(),
            start_time: record.start_time,
            end_time: record.end_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::{diamond, manager};
    use crate::domain::result::NodeResult;
    use crate::domain::status::NodeStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn counts_follow_node_updates() {
        let (manager, _) = manager();
        let id = manager.make_dispatch(&diamond(), None).await.unwrap();
        manager
            .update_node_result(id, NodeResult::new(NodeId::new(0)).with_status(NodeStatus::Completed))
            .await
            .unwrap();
        manager
            .update_node_result(id, NodeResult::new(NodeId::new(1)).with_status(NodeStatus::Running))
            .await
            .unwrap();

        let counts = manager.node_counts(id).await.unwrap();

        assert_eq!(counts.completed, 1);
        assert_eq!(counts.running, 1);
        assert_eq!(counts.new, 2);
        assert_eq!(counts.total(), 4);
    }

    #[tokio::test]
    async fn summary_reports_identity_and_status() {
        let (manager, _) = manager();
        let id = manager.make_dispatch(&diamond(), None).await.unwrap();

        let summary = manager.summary(id).await.unwrap();

        assert_eq!(summary.dispatch_id, id);
        assert_eq!(summary.root_dispatch_id, id);
        assert_eq!(summary.name, "diamond");
        assert_eq!(summary.status, DispatchStatus::New);
        assert!(!summary.finished);
        assert_eq!(summary.pending, 4);
        assert!(summary.dirty.is_empty());
    }

    #[tokio::test]
    async fn summary_tracks_settled_nodes_and_finished_dispatch() {
        let (manager, _) = manager();
        let id = manager.make_dispatch(&diamond(), None).await.unwrap();
        for (node, status) in [
            (0, NodeStatus::Completed),
            (1, NodeStatus::Failed),
            (2, NodeStatus::Running),
        ] {
            manager
                .update_node_result(id, NodeResult::new(NodeId::new(node)).with_status(status))
                .await
                .unwrap();
        }

        let running = manager.summary(id).await.unwrap();
        assert_eq!(running.pending, 2);
        assert!(!running.finished);

        manager.get_dispatch(id).unwrap().lock().await.status = DispatchStatus::Failed;
        assert!(manager.summary(id).await.unwrap().finished);
    }

    #[tokio::test]
    async fn views_of_unknown_dispatch_fail() {
        let (manager, _) = manager();
        let missing = DispatchId::from_uuid(Uuid::new_v4());

        assert!(matches!(
            manager.node_counts(missing).await,
            Err(DispatchError::UnknownDispatch(_))
        ));
        assert!(matches!(
            manager.summary(missing).await,
            Err(DispatchError::UnknownDispatch(_))
        ));
    }
}

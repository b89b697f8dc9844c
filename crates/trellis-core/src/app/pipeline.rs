//! Node update pipeline - ノード状態遷移の唯一の経路
//!
//! メモリに適用 → 永続化 → 状態をキューへ、をすべてレコードの lock 内で行います。
//! 書き込みに失敗したノードはエラーを返さず FAILED に落とすので、
//! チャネルで待つ受け手は必ずノードの決着を見ます。

use tracing::{debug, error};

use super::channel::StatusEvent;
use super::manager::DispatchManager;
use crate::domain::errors::DispatchError;
use crate::domain::ids::DispatchId;
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;
use crate::domain::status::NodeStatus;

impl DispatchManager {
    /// 稼働中 dispatch に `result` を適用し、状態を報告する
    ///
    /// # Errors
    /// - `UnknownDispatch`: dispatch が登録されていない
    /// - `ChannelClosed`: 待機中に dispatch が finalize され、状態を積めなかった
    ///
    /// 永続化の失敗は外に出しません。ログに残し、ノードを FAILED にします。
    pub async fn update_node_result(
        &self,
        dispatch_id: DispatchId,
        result: NodeResult,
    ) -> Result<(), DispatchError> {
        let (handle, channel) = self.registry.lookup(dispatch_id)?;
        let mut record = handle.lock().await;

        let status = match self.write_node(&mut record, &result).await {
            Ok(status) => status,
            Err(err) => {
                error!(
                    dispatch_id = %dispatch_id,
                    node_id = %result.node_id,
                    requested = ?result.status,
                    kind = ?err.kind(),
                    error = %err,
                    "failed to persist node update; marking node FAILED"
                );
                if let Some(node) = record.graph_mut().node_mut(result.node_id) {
                    node.status = NodeStatus::Failed;
                }
                Some(NodeStatus::Failed)
            }
        };

        if let Some(status) = status {
            channel.send(StatusEvent::new(result.node_id, status))?;
            debug!(dispatch_id = %dispatch_id, node_id = %result.node_id, status = ?status, "node status enqueued");
        }
        Ok(())
    }

    async fn write_node(
        &self,
        record: &mut DispatchRecord,
        result: &NodeResult,
    ) -> Result<Option<NodeStatus>, DispatchError> {
        let dispatch_id = record.dispatch_id;
        let node = record
            .graph_mut()
            .node_mut(result.node_id)
            .ok_or(DispatchError::UnknownNode {
                dispatch_id,
                node_id: result.node_id,
            })?;
        node.apply(result);

        self.store.update_node(dispatch_id, result).await?;
        Ok(result.status)
    }
}

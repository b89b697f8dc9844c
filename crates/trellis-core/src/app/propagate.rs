//! Sublattice propagator - 親への結果伝播と dispatch の終了処理
//!
//! 終了した sub-dispatch は、親の更新パイプラインに合成ノード結果を
//! 投げることで親へ報告します。子が親レコードを直接 lock することはありません。
//!
//! # 設計
//! - 子の永続化 → 親ノードの更新、の順（親の失敗で子の永続化は巻き戻さない）
//! - 親への伝播失敗は `DispatchError::Propagation` で包む
//! - finalize で registry から外し、状態チャネルを close する

use tracing::{debug, error, info};

use super::manager::DispatchManager;
use crate::domain::errors::DispatchError;
use crate::domain::ids::{DispatchId, NodeId};
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;

impl DispatchManager {
    /// dispatch を永続化し、親ノードがあればそれを更新する
    ///
    /// 親の更新に失敗しても、子自身の永続化は取り消されません。
    pub async fn persist_result(&self, dispatch_id: DispatchId) -> Result<(), DispatchError> {
        let handle = self.registry.get(dispatch_id)?;
        let snapshot = handle.lock().await.clone();

        self.store.persist(&snapshot).await?;
        debug!(dispatch_id = %dispatch_id, status = ?snapshot.status, "persisted dispatch");

        self.update_parent_electron(snapshot).await
    }

    async fn update_parent_electron(&self, record: DispatchRecord) -> Result<(), DispatchError> {
        let Some(parent) = record.parent_electron else {
            return Ok(());
        };
        let dispatch_id = record.dispatch_id;
        let result = sublattice_result(parent.node_id, record);

        debug!(
            dispatch_id = %dispatch_id,
            parent = %parent,
            status = ?result.status,
            "updating sublattice parent node"
        );
        self.update_node_result(parent.dispatch_id, result)
            .await
            .map_err(|source| {
                error!(
                    dispatch_id = %dispatch_id,
                    parent = %parent,
                    kind = ?source.kind(),
                    error = %source,
                    "failed to propagate sub-dispatch result"
                );
                DispatchError::Propagation {
                    dispatch_id,
                    parent_id: parent.dispatch_id,
                    source: Box::new(source),
                }
            })
    }

    /// dispatch を登録解除する（レコードはストレージに残る）
    ///
    /// 状態チャネルも close されるため、`recv` で待っている受け手は
    /// 残りのイベントを受け取った後 `None` で抜けます。
    pub fn finalize_dispatch(&self, dispatch_id: DispatchId) -> Result<(), DispatchError> {
        self.registry.deregister(dispatch_id)?;
        info!(dispatch_id = %dispatch_id, "finalized dispatch");
        Ok(())
    }

    /// 終了時刻を刻み、永続化・伝播してから登録解除する
    ///
    /// 親の更新に失敗しても登録解除し、その失敗を返します。
    /// dispatch 自身の永続化に失敗した場合は登録を残します（呼び出し側が再試行できる）。
    pub async fn complete_dispatch(&self, dispatch_id: DispatchId) -> Result<(), DispatchError> {
        let handle = self.registry.get(dispatch_id)?;
        {
            let mut record = handle.lock().await;
            if record.end_time.is_none() {
                record.end_time = Some(self.clock.now());
            }
        }

        match self.persist_result(dispatch_id).await {
            Ok(()) => self.finalize_dispatch(dispatch_id),
            Err(err @ DispatchError::Propagation { .. }) => {
                self.finalize_dispatch(dispatch_id)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// workflow 単位のメタデータ（名前、ノード数、状態、時刻）を書く
    pub async fn upsert_workflow_data(&self, dispatch_id: DispatchId) -> Result<(), DispatchError> {
        let handle = self.registry.get(dispatch_id)?;
        let snapshot = handle.lock().await.clone();
        self.store.upsert_workflow_data(&snapshot).await?;
        Ok(())
    }
}

/// 終了した sub-dispatch を生成元ノードへ報告する合成ノード結果
fn sublattice_result(node_id: NodeId, record: DispatchRecord) -> NodeResult {
    let mut result = NodeResult::new(node_id).with_status(record.status.as_parent_node_status());
    result.end_time = record.end_time;
    result.output = record.result.clone();
    result.error = record.error.clone();
    result.with_sublattice(record)
}

//! Record builder - workflow 定義から新しい dispatch を作る
//!
//! # 設計
//! - `initialize_record` は構築のみ（永続化も登録もしない）
//! - `admit` は既に登録中の id を永続化前に弾く（保存済みレコードを上書きしない）

use tracing::{debug, info};

use super::manager::DispatchManager;
use crate::domain::errors::DispatchError;
use crate::domain::ids::{DispatchId, NodeId};
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;

impl DispatchManager {
    /// Build a fresh record without persisting or registering it.
    ///
    /// With a parent, the record joins the parent's sub-workflow chain and
    /// points back at `parent_node_id`, which must exist in the parent graph.
    pub fn initialize_record(
        &self,
        definition: &str,
        parent: Option<(&DispatchRecord, NodeId)>,
    ) -> Result<DispatchRecord, DispatchError> {
        let dispatch_id = self.ids.generate_dispatch_id();
        let workflow = self.codec.decode(definition)?;
        let mut record = DispatchRecord::new(dispatch_id, workflow, self.clock.now());

        if let Some((parent, node_id)) = parent {
            if !parent.graph().contains(node_id) {
                return Err(DispatchError::UnknownNode {
                    dispatch_id: parent.dispatch_id,
                    node_id,
                });
            }
            record.link_parent(parent, node_id);
        }

        record.initialize_nodes();
        debug!(
            dispatch_id = %dispatch_id,
            workflow = %record.workflow.name,
            num_nodes = record.num_nodes(),
            "initialized dispatch record"
        );
        Ok(record)
    }

    /// Build, persist and register a new dispatch.
    pub async fn make_dispatch(
        &self,
        definition: &str,
        parent: Option<(&DispatchRecord, NodeId)>,
    ) -> Result<DispatchId, DispatchError> {
        let record = self.initialize_record(definition, parent)?;
        self.admit(record).await
    }

    /// Spawn a sub-dispatch for `node_id` of the live dispatch `parent_id`.
    ///
    /// The parent node is linked to the new dispatch through the parent's
    /// update pipeline; that update carries no status, so the parent's
    /// channel sees no event.
    pub async fn make_sub_dispatch(
        &self,
        definition: &str,
        parent_id: DispatchId,
        node_id: NodeId,
    ) -> Result<DispatchId, DispatchError> {
        let parent = self.registry.get(parent_id)?;
        let record = {
            let parent = parent.lock().await;
            self.initialize_record(definition, Some((&parent, node_id)))?
        };
        let dispatch_id = self.admit(record).await?;

        self.update_node_result(parent_id, NodeResult::new(node_id).with_sub_dispatch(dispatch_id))
            .await?;
        Ok(dispatch_id)
    }

    /// 永続化してから登録する
    pub(crate) async fn admit(&self, record: DispatchRecord) -> Result<DispatchId, DispatchError> {
        let dispatch_id = record.dispatch_id;
        if self.registry.contains(dispatch_id) {
            return Err(DispatchError::DuplicateDispatch(dispatch_id));
        }
        self.store.persist(&record).await?;
        self.registry.register(record)?;
        info!(dispatch_id = %dispatch_id, "registered dispatch");
        Ok(dispatch_id)
    }
}

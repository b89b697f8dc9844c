//! InMemoryDispatchStore - 開発用・テスト用のストア
//!
//! レコードは clone して保持するので、稼働中レコードへの後からの変更は
//! 再度 persist されるまでここには見えません。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::ids::DispatchId;
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;
use crate::domain::status::DispatchStatus;
use crate::ports::DispatchStore;

/// dispatch の workflow 単位メタデータ（1 行分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowData {
    pub dispatch_id: DispatchId,
    pub root_dispatch_id: DispatchId,
    pub name: String,
    pub num_nodes: usize,
    pub status: DispatchStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<&DispatchRecord> for WorkflowData {
    fn from(record: &DispatchRecord) -> Self {
        Self {
            dispatch_id: record.dispatch_id,
            root_dispatch_id: record.root_dispatch_id,
            name: record.workflow.name.clone(),
            num_nodes: record.num_nodes(),
            status: record.status,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

#[derive(Default)]
struct StoreState {
    records: HashMap<DispatchId, DispatchRecord>,
    workflows: HashMap<DispatchId, WorkflowData>,
}

/// メモリ上の `DispatchStore`
#[derive(Clone, Default)]
pub struct InMemoryDispatchStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDispatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn workflow_data(&self, dispatch_id: DispatchId) -> Option<WorkflowData> {
        let state = self.state.lock().await;
        state.workflows.get(&dispatch_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }
}

#[async_trait]
impl DispatchStore for InMemoryDispatchStore {
    async fn persist(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.records.insert(record.dispatch_id, record.clone());
        Ok(())
    }

    async fn load(&self, dispatch_id: DispatchId) -> Result<DispatchRecord, StoreError> {
        let state = self.state.lock().await;
        state
            .records
            .get(&dispatch_id)
            .cloned()
            .ok_or(StoreError::NotFound(dispatch_id))
    }

    async fn update_node(
        &self,
        dispatch_id: DispatchId,
        result: &NodeResult,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(&dispatch_id)
            .ok_or(StoreError::NotFound(dispatch_id))?;
        let node = record
            .graph_mut()
            .node_mut(result.node_id)
            .ok_or(StoreError::NodeNotFound {
                dispatch_id,
                node_id: result.node_id,
            })?;
        node.apply(result);
        Ok(())
    }

    async fn upsert_workflow_data(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .workflows
            .insert(record.dispatch_id, WorkflowData::from(record));
        Ok(())
    }
}

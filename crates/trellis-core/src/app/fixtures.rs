//! Shared test wiring for the application layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use super::builder::DispatchManagerBuilder;
use super::manager::DispatchManager;
use crate::config::TrellisConfig;
use crate::domain::errors::StoreError;
use crate::domain::ids::DispatchId;
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;
use crate::impls::InMemoryDispatchStore;
use crate::ports::{DispatchStore, FixedClock};

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

/// load(0) -> left(1), right(2) -> join(3)
pub(crate) fn diamond() -> String {
    json!({
        "name": "diamond",
        "tasks": [
            {"id": 0, "name": "load", "payload": {"fn": "load"}},
            {"id": 1, "name": "left", "payload": {"fn": "left"}},
            {"id": 2, "name": "right", "payload": {"fn": "right"}},
            {"id": 3, "name": "join", "payload": {"fn": "join"}}
        ],
        "edges": [
            {"source": 0, "target": 1},
            {"source": 0, "target": 2},
            {"source": 1, "target": 3},
            {"source": 2, "target": 3}
        ]
    })
    .to_string()
}

pub(crate) fn single(name: &str) -> String {
    json!({
        "name": name,
        "tasks": [{"id": 0, "name": name}]
    })
    .to_string()
}

pub(crate) fn manager_with(
    store: Arc<dyn DispatchStore>,
    config: TrellisConfig,
) -> DispatchManager {
    DispatchManagerBuilder::new()
        .store(store)
        .clock(Arc::new(FixedClock::new(now())))
        .config(config)
        .build()
        .unwrap()
}

pub(crate) fn manager() -> (DispatchManager, InMemoryDispatchStore) {
    let store = InMemoryDispatchStore::new();
    let manager = manager_with(Arc::new(store.clone()), TrellisConfig::default());
    (manager, store)
}

/// In-memory store whose node writes can be switched to fail.
#[derive(Clone, Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: InMemoryDispatchStore,
    fail_node_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(crate) fn fail_node_writes(&self, fail: bool) {
        self.fail_node_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DispatchStore for FlakyStore {
    async fn persist(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        self.inner.persist(record).await
    }

    async fn load(&self, dispatch_id: DispatchId) -> Result<DispatchRecord, StoreError> {
        self.inner.load(dispatch_id).await
    }

    async fn update_node(
        &self,
        dispatch_id: DispatchId,
        result: &NodeResult,
    ) -> Result<(), StoreError> {
        if self.fail_node_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("node write rejected".to_string()));
        }
        self.inner.update_node(dispatch_id, result).await
    }

    async fn upsert_workflow_data(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        self.inner.upsert_workflow_data(record).await
    }
}

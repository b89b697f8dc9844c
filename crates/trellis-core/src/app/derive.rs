//! Reuse differencer - 保存済みレコードからの再 dispatch
//!
//! # 2 つの形
//! - 新しい定義: デコードし、`GraphDiff` が再利用可能と判断したノードの結果を引き継ぐ
//! - 同じ定義: 以前のグラフを複製し、COMPLETED のノードだけ結果を残す
//!
//! # 不変条件
//! - ノードが dirty ⇔ 導出で NEW にリセットされた

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use super::manager::DispatchManager;
use crate::config::OverridePolicy;
use crate::domain::errors::DispatchError;
use crate::domain::ids::{DispatchId, NodeId};
use crate::domain::record::{DispatchRecord, Workflow};
use crate::domain::status::NodeStatus;

/// ノード名をキーにした payload の上書き
pub type ElectronUpdates = BTreeMap<String, serde_json::Value>;

impl DispatchManager {
    /// 保存済みレコード `prior_id` から新しい dispatch を導出し、永続化・登録する
    ///
    /// 以前のレコードはストレージから読むので、finalize 済みの dispatch も再実行できます。
    pub async fn make_derived_dispatch(
        &self,
        prior_id: DispatchId,
        definition: Option<&str>,
        overrides: &ElectronUpdates,
        reuse: bool,
    ) -> Result<DispatchId, DispatchError> {
        let prior = self.store.load(prior_id).await?;
        let record = self.derive_record(&prior, definition, overrides, reuse)?;
        let dirty = record.graph().dirty_nodes().len();

        let dispatch_id = self.admit(record).await?;
        info!(
            dispatch_id = %dispatch_id,
            prior_id = %prior_id,
            reuse,
            dirty,
            "derived dispatch"
        );
        Ok(dispatch_id)
    }

    /// 導出したレコードを組み立てるだけ（永続化も登録もしない）
    pub fn derive_record(
        &self,
        prior: &DispatchRecord,
        definition: Option<&str>,
        overrides: &ElectronUpdates,
        reuse: bool,
    ) -> Result<DispatchRecord, DispatchError> {
        let dispatch_id = self.ids.generate_dispatch_id();

        let (workflow, mut reused) = match definition {
            Some(definition) => self.from_new_definition(prior, definition, reuse)?,
            None => from_prior_workflow(prior, reuse),
        };
        let mut record = DispatchRecord::new(dispatch_id, workflow, self.clock.now());

        let overridden = apply_overrides(&mut record, overrides);
        for node_id in &overridden {
            reused.remove(node_id);
        }

        // None: 全ノードを再実行
        let dirty: Option<BTreeSet<NodeId>> = if overridden.is_empty() {
            Some(not_reused(&record, &reused))
        } else {
            match self.config.override_policy {
                OverridePolicy::MarkAll => None,
                OverridePolicy::Downstream => {
                    let mut dirty = record.graph().descendants(overridden.iter().copied());
                    dirty.extend(overridden.iter().copied());
                    dirty.extend(not_reused(&record, &reused));
                    Some(dirty)
                }
            }
        };

        let graph = record.graph_mut();
        match dirty {
            None => {
                graph.initialize_nodes();
                graph.mark_all_dirty();
            }
            Some(dirty) => {
                for node_id in &dirty {
                    if let Some(node) = graph.node_mut(*node_id) {
                        node.reset();
                    }
                }
                graph.set_dirty(dirty);
            }
        }

        debug!(
            dispatch_id = %dispatch_id,
            prior_id = %prior.dispatch_id,
            reused = reused.len(),
            overridden = overridden.len(),
            dirty = record.graph().dirty_nodes().len(),
            "derived dispatch record"
        );
        Ok(record)
    }

    fn from_new_definition(
        &self,
        prior: &DispatchRecord,
        definition: &str,
        reuse: bool,
    ) -> Result<(Workflow, BTreeSet<NodeId>), DispatchError> {
        let mut workflow = self.codec.decode(definition)?;
        workflow.graph.initialize_nodes();
        if !reuse {
            return Ok((workflow, BTreeSet::new()));
        }

        let reusable = self.diff.reusable_nodes(prior.graph(), &workflow.graph);
        self.diff
            .copy_nodes(prior.graph(), &mut workflow.graph, &reusable);
        Ok((workflow, reusable.into_iter().collect()))
    }
}

fn from_prior_workflow(prior: &DispatchRecord, reuse: bool) -> (Workflow, BTreeSet<NodeId>) {
    let mut workflow = prior.workflow.clone();
    if !reuse {
        workflow.graph.initialize_nodes();
        return (workflow, BTreeSet::new());
    }

    let reused = workflow
        .graph
        .nodes()
        .filter(|node| node.status == NodeStatus::Completed)
        .map(|node| node.id)
        .collect();
    (workflow, reused)
}

/// `overrides` に名前があるノードの payload を置き換える
///
/// 書き換えたノードの id を返します。
fn apply_overrides(record: &mut DispatchRecord, overrides: &ElectronUpdates) -> BTreeSet<NodeId> {
    let mut overridden = BTreeSet::new();
    for (name, payload) in overrides {
        let mut matched = false;
        for node in record.graph_mut().nodes_mut().filter(|node| &node.name == name) {
            node.payload = payload.clone();
            overridden.insert(node.id);
            matched = true;
        }
        if !matched {
            warn!(
                dispatch_id = %record.dispatch_id,
                node_name = %name,
                "override names no node in the workflow; ignoring"
            );
        }
    }
    overridden
}

fn not_reused(record: &DispatchRecord, reused: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    record
        .graph()
        .node_ids()
        .filter(|node_id| !reused.contains(node_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::fixtures::{diamond, manager, manager_with, now};
    use crate::config::TrellisConfig;
    use crate::domain::errors::StoreError;
    use crate::domain::result::NodeResult;
    use crate::impls::InMemoryDispatchStore;
    use crate::ports::DispatchStore;
    use serde_json::json;
    use uuid::Uuid;

    fn ids(values: &[u32]) -> BTreeSet<NodeId> {
        values.iter().copied().map(NodeId::new).collect()
    }

    /// A finished diamond where every node output is `id * 10`.
    async fn completed_diamond(manager: &DispatchManager) -> DispatchId {
        let id = manager.make_dispatch(&diamond(), None).await.unwrap();
        for n in 0..4 {
            manager
                .update_node_result(
                    id,
                    NodeResult::new(NodeId::new(n))
                        .with_status(NodeStatus::Completed)
                        .with_end_time(now())
                        .with_output(json!(n * 10)),
                )
                .await
                .unwrap();
        }
        manager.persist_result(id).await.unwrap();
        id
    }

    fn downstream_manager() -> DispatchManager {
        manager_with(
            Arc::new(InMemoryDispatchStore::new()),
            TrellisConfig {
                override_policy: OverridePolicy::Downstream,
                ..TrellisConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn reuse_of_same_definition_keeps_outputs_and_nothing_is_dirty() {
        let (manager, _) = manager();
        let prior = completed_diamond(&manager).await;

        let id = manager
            .make_derived_dispatch(prior, None, &ElectronUpdates::new(), true)
            .await
            .unwrap();

        assert_ne!(id, prior);
        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert_eq!(record.num_nodes(), 4);
        for node in record.graph().nodes() {
            assert_eq!(node.status, NodeStatus::Completed);
            assert_eq!(node.output, Some(json!(node.id.get() * 10)));
        }
        assert!(record.graph().dirty_nodes().is_empty());
    }

    #[tokio::test]
    async fn declined_reuse_resets_everything() {
        let (manager, _) = manager();
        let prior = completed_diamond(&manager).await;

        let id = manager
            .make_derived_dispatch(prior, None, &ElectronUpdates::new(), false)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert!(record.graph().nodes().all(|n| n.status == NodeStatus::New && n.output.is_none()));
        assert_eq!(record.graph().dirty_nodes(), &ids(&[0, 1, 2, 3]));
    }

    #[tokio::test]
    async fn same_definition_recomputes_unfinished_nodes() {
        let (manager, _) = manager();
        let prior = manager.make_dispatch(&diamond(), None).await.unwrap();
        manager
            .update_node_result(
                prior,
                NodeResult::new(NodeId::new(0))
                    .with_status(NodeStatus::Completed)
                    .with_output(json!(0)),
            )
            .await
            .unwrap();
        manager
            .update_node_result(
                prior,
                NodeResult::new(NodeId::new(1))
                    .with_status(NodeStatus::Failed)
                    .with_error("boom"),
            )
            .await
            .unwrap();
        manager.persist_result(prior).await.unwrap();

        let id = manager
            .make_derived_dispatch(prior, None, &ElectronUpdates::new(), true)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert_eq!(record.graph().dirty_nodes(), &ids(&[1, 2, 3]));
        let failed = record.graph().node(NodeId::new(1)).unwrap();
        assert_eq!(failed.status, NodeStatus::New);
        assert!(failed.error.is_none());
    }

    #[tokio::test]
    async fn new_definition_reuses_only_unchanged_prefix() {
        let (manager, _) = manager();
        let prior = completed_diamond(&manager).await;

        let edited = diamond().replace(r#"{"fn":"right"}"#, r#"{"fn":"right-v2"}"#);
        let id = manager
            .make_derived_dispatch(prior, Some(&edited), &ElectronUpdates::new(), true)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert_eq!(record.graph().dirty_nodes(), &ids(&[2, 3]));
        assert_eq!(record.graph().node(NodeId::new(1)).unwrap().output, Some(json!(10)));
        assert_eq!(record.graph().node(NodeId::new(2)).unwrap().status, NodeStatus::New);
        assert_eq!(record.graph().node(NodeId::new(3)).unwrap().status, NodeStatus::New);
    }

    #[tokio::test]
    async fn new_definition_without_reuse_is_all_new() {
        let (manager, _) = manager();
        let prior = completed_diamond(&manager).await;

        let id = manager
            .make_derived_dispatch(prior, Some(&diamond()), &ElectronUpdates::new(), false)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert!(record.graph().nodes().all(|n| n.status == NodeStatus::New));
        assert_eq!(record.graph().dirty_nodes().len(), 4);
    }

    #[tokio::test]
    async fn override_marks_every_node_dirty_by_default() {
        let (manager, _) = manager();
        let prior = completed_diamond(&manager).await;
        let overrides = ElectronUpdates::from([("left".to_string(), json!({"fn": "left-v2"}))]);

        let id = manager
            .make_derived_dispatch(prior, None, &overrides, true)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert_eq!(record.graph().dirty_nodes(), &ids(&[0, 1, 2, 3]));
        assert!(record.graph().nodes().all(|n| n.status == NodeStatus::New && n.output.is_none()));
        assert_eq!(
            record.graph().node(NodeId::new(1)).unwrap().payload,
            json!({"fn": "left-v2"})
        );
    }

    #[tokio::test]
    async fn downstream_policy_limits_dirty_set_to_descendants() {
        let manager = downstream_manager();
        let prior = completed_diamond(&manager).await;
        let overrides = ElectronUpdates::from([("left".to_string(), json!({"fn": "left-v2"}))]);

        let id = manager
            .make_derived_dispatch(prior, None, &overrides, true)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        let record = handle.lock().await;
        assert_eq!(record.graph().dirty_nodes(), &ids(&[1, 3]));
        assert_eq!(record.graph().node(NodeId::new(2)).unwrap().status, NodeStatus::Completed);
        assert_eq!(record.graph().node(NodeId::new(3)).unwrap().status, NodeStatus::New);
    }

    #[tokio::test]
    async fn unknown_override_is_ignored() {
        let manager = downstream_manager();
        let prior = completed_diamond(&manager).await;
        let overrides = ElectronUpdates::from([("nope".to_string(), json!(1))]);

        let id = manager
            .make_derived_dispatch(prior, None, &overrides, true)
            .await
            .unwrap();

        let handle = manager.get_dispatch(id).unwrap();
        assert!(handle.lock().await.graph().dirty_nodes().is_empty());
    }

    #[tokio::test]
    async fn derived_dispatch_is_a_fresh_root() {
        let (manager, store) = manager();
        let parent = manager.make_dispatch(&diamond(), None).await.unwrap();
        let child = manager
            .make_sub_dispatch(&diamond(), parent, NodeId::new(0))
            .await
            .unwrap();

        let id = manager
            .make_derived_dispatch(child, None, &ElectronUpdates::new(), false)
            .await
            .unwrap();

        let stored = store.load(id).await.unwrap();
        assert_eq!(stored.root_dispatch_id, id);
        assert!(stored.parent_electron.is_none());
    }

    #[tokio::test]
    async fn unknown_prior_is_a_store_error() {
        let (manager, _) = manager();
        let missing = DispatchId::from_uuid(Uuid::new_v4());

        let err = manager
            .make_derived_dispatch(missing, None, &ElectronUpdates::new(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Store(StoreError::NotFound(id)) if id == missing));
    }
}

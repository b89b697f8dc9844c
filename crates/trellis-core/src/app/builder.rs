//! DispatchManagerBuilder - ポートを `DispatchManager` に組み立てる

use std::sync::Arc;

use super::manager::DispatchManager;
use super::registry::DispatchRegistry;
use crate::config::TrellisConfig;
use crate::impls::{JsonWorkflowCodec, StructuralDiff};
use crate::ports::{
    Clock, DispatchStore, GraphDiff, IdGenerator, SystemClock, UuidGenerator, WorkflowCodec,
};

/// DispatchManagerBuilder は `DispatchManager` を構築する
///
/// # 使用例
/// ```ignore
/// let manager = DispatchManagerBuilder::new()
///     .store(Arc::new(InMemoryDispatchStore::new()))
///     .config(TrellisConfig::from_env()?)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - 必須ポートの欠落は最初のライフサイクル呼び出しではなく `build()` で報告
/// - 必須は store のみ。その他は省略時に以下を使う：
///   - codec: `JsonWorkflowCodec`
///   - diff: `StructuralDiff`
///   - ids: `UuidGenerator`
///   - clock: `SystemClock`
///   - registry: 空の新しい registry
pub struct DispatchManagerBuilder {
    registry: Option<Arc<DispatchRegistry>>,
    store: Option<Arc<dyn DispatchStore>>,
    codec: Option<Arc<dyn WorkflowCodec>>,
    diff: Option<Arc<dyn GraphDiff>>,
    ids: Option<Arc<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    config: TrellisConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing dispatch store. Call `.store(..)` before `.build()`.")]
    MissingStore,
}

impl DispatchManagerBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            store: None,
            codec: None,
            diff: None,
            ids: None,
            clock: None,
            config: TrellisConfig::default(),
        }
    }

    /// 既存の registry を共有する（プロセスのランタイムが持つものなど）
    pub fn registry(mut self, registry: Arc<DispatchRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn store(mut self, store: Arc<dyn DispatchStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn WorkflowCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn diff(mut self, diff: Arc<dyn GraphDiff>) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: TrellisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<DispatchManager, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        Ok(DispatchManager {
            registry: self.registry.unwrap_or_default(),
            store,
            codec: self
                .codec
                .unwrap_or_else(|| Arc::new(JsonWorkflowCodec::new())),
            diff: self.diff.unwrap_or_else(|| Arc::new(StructuralDiff::new())),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidGenerator::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        })
    }
}

impl Default for DispatchManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverridePolicy;
    use crate::impls::InMemoryDispatchStore;

    #[test]
    fn build_success() {
        let manager = DispatchManagerBuilder::new()
            .store(Arc::new(InMemoryDispatchStore::new()))
            .build();
        assert!(manager.is_ok());
    }

    #[test]
    fn build_without_store_fails() {
        let manager = DispatchManagerBuilder::new().build();
        assert!(matches!(manager, Err(BuildError::MissingStore)));
    }

    #[test]
    fn injected_registry_is_shared() {
        let registry = Arc::new(DispatchRegistry::new());
        let manager = DispatchManagerBuilder::new()
            .store(Arc::new(InMemoryDispatchStore::new()))
            .registry(Arc::clone(&registry))
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(manager.registry(), &registry));
    }

    #[test]
    fn config_is_carried_over() {
        let config = TrellisConfig {
            override_policy: OverridePolicy::Downstream,
            ..TrellisConfig::default()
        };
        let manager = DispatchManagerBuilder::new()
            .store(Arc::new(InMemoryDispatchStore::new()))
            .config(config.clone())
            .build()
            .unwrap();

        assert_eq!(manager.config(), &config);
    }
}

//! DispatchManager - 実行エンジンが使う dispatch ライフサイクルの窓口
//!
//! 操作は関心ごとにファイルを分けています：
//! - `make`: 新しい dispatch の構築と登録
//! - `derive`: 保存済みレコードからの再 dispatch（結果の再利用あり）
//! - `pipeline`: ノード結果の適用
//! - `propagate`: 永続化、親への伝播、終了処理
//! - `status`: 読み取り専用のビュー
//!
//! # 学習ポイント
//! - `impl DispatchManager` を複数ファイルに分割できる（同一クレート内なら可）
//! - ポートは `Arc<dyn Trait>` で保持し、Clone しても同じ実体を共有する

use std::sync::Arc;

use super::channel::StatusChannel;
use super::registry::{DispatchHandle, DispatchRegistry};
use crate::config::TrellisConfig;
use crate::domain::errors::DispatchError;
use crate::domain::ids::DispatchId;
use crate::ports::{Clock, DispatchStore, GraphDiff, IdGenerator, WorkflowCodec};

/// registry と各ポート（storage / codec / diff / id / clock）を束ねる
///
/// Clone は安価で、クローン同士は同じ registry とポートを共有します。
#[derive(Clone)]
pub struct DispatchManager {
    pub(crate) registry: Arc<DispatchRegistry>,
    pub(crate) store: Arc<dyn DispatchStore>,
    pub(crate) codec: Arc<dyn WorkflowCodec>,
    pub(crate) diff: Arc<dyn GraphDiff>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: TrellisConfig,
}

impl DispatchManager {
    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DispatchStore> {
        &self.store
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    /// 登録中 dispatch のレコード
    pub fn get_dispatch(&self, dispatch_id: DispatchId) -> Result<DispatchHandle, DispatchError> {
        self.registry.get(dispatch_id)
    }

    pub fn status_channel(&self, dispatch_id: DispatchId) -> Result<StatusChannel, DispatchError> {
        self.registry.channel_for(dispatch_id)
    }
}

impl std::fmt::Debug for DispatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchManager")
            .field("live_dispatches", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

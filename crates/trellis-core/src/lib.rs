//! trellis-core
//!
//! workflow グラフの dispatch ライフサイクル管理：
//! - dispatch レコードの構築と再導出
//! - ノード結果の適用と状態イベントの配信
//! - 終了した sub-workflow の親 dispatch への伝播
//!
//! # モジュール構成
//! - **domain**: ids, statuses, task graphs, dispatch records, errors
//! - **ports**: storage, workflow codec, graph diff, id generator, clock
//! - **impls**: in-memory store, JSON codec, structural diff
//! - **app**: registry, status channels and the `DispatchManager`
//! - **config**: `TrellisConfig`

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{
    DispatchManager, DispatchManagerBuilder, DispatchRegistry, ElectronUpdates, StatusChannel,
    StatusEvent,
};
pub use config::{OverridePolicy, TrellisConfig};
pub use domain::{DispatchError, DispatchId, DispatchRecord, NodeId, NodeResult};

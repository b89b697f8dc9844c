//! App - アプリケーション層
//!
//! ports を組み合わせて dispatch のライフサイクルを実現します。
//!
//! # 主要コンポーネント
//! - **DispatchManagerBuilder**: 組み立てと fail-fast 検証
//! - **DispatchManager**: 実行エンジン向けのライフサイクル窓口
//! - **DispatchRegistry**: 稼働中の dispatch と状態チャネル
//! - **StatusChannel**: dispatch ごとの順序付きノード状態イベント

pub mod builder;
pub mod channel;
pub mod derive;
pub mod make;
pub mod manager;
pub mod pipeline;
pub mod propagate;
pub mod registry;
pub mod status;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::builder::{BuildError, DispatchManagerBuilder};
pub use self::channel::{StatusChannel, StatusEvent};
pub use self::derive::ElectronUpdates;
pub use self::manager::DispatchManager;
pub use self::registry::{DispatchHandle, DispatchRegistry};
pub use self::status::DispatchSummary;

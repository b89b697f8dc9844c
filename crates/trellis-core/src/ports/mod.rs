//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は dispatch manager が使うが所有しない外部システムへの
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 含まれる trait
//! - **DispatchStore**: 永続化（finalize 後の正本）
//! - **WorkflowCodec**: workflow 定義のデコード
//! - **GraphDiff**: 再 dispatch 時の構造比較
//! - **IdGenerator** / **Clock**: ID と時刻

pub mod clock;
pub mod dispatch_store;
pub mod graph_diff;
pub mod id_generator;
pub mod workflow_codec;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dispatch_store::DispatchStore;
pub use self::graph_diff::GraphDiff;
pub use self::id_generator::{IdGenerator, UuidGenerator};
pub use self::workflow_codec::WorkflowCodec;

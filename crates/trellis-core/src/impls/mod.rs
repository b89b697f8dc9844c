//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports のプロセス内実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryDispatchStore**: 開発用・テスト用のストア
//! - **JsonWorkflowCodec**: JSON の workflow 定義
//! - **StructuralDiff**: デフォルトの再利用判定

pub mod inmem_store;
pub mod json_codec;
pub mod structural_diff;

pub use self::inmem_store::{InMemoryDispatchStore, WorkflowData};
pub use self::json_codec::JsonWorkflowCodec;
pub use self::structural_diff::StructuralDiff;

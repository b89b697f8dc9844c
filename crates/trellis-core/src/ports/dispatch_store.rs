//! DispatchStore port - dispatch レコードの永続化
//!
//! finalize 後の dispatch にとってはストアが正本（source of truth）です。
//! メモリ上の registry は稼働中の dispatch だけを持ち、再 dispatch は
//! 以前のレコードをここから読み込みます。
//!
//! # 実装
//! - **InMemoryDispatchStore**: 開発用・テスト用

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::ids::DispatchId;
use crate::domain::record::DispatchRecord;
use crate::domain::result::NodeResult;

/// DispatchStore は dispatch レコードを保存・読み込みする
///
/// # 設計原則
/// - dispatch manager がレコードを削除することはない
/// - `update_node` はノード 1 つ分の書き込み。メモリ上の更新とは独立に失敗しうるので、
///   復旧方法は呼び出し側が決める
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// レコード全体を挿入または上書き
    async fn persist(&self, record: &DispatchRecord) -> Result<(), StoreError>;

    /// id でレコードを読み込む
    async fn load(&self, dispatch_id: DispatchId) -> Result<DispatchRecord, StoreError>;

    /// 保存済み dispatch のノード 1 つ分の更新を書き込む
    async fn update_node(
        &self,
        dispatch_id: DispatchId,
        result: &NodeResult,
    ) -> Result<(), StoreError>;

    /// workflow 単位のメタデータを挿入または上書き
    async fn upsert_workflow_data(&self, record: &DispatchRecord) -> Result<(), StoreError>;
}

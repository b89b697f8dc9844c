//! Domain identifiers (strongly-typed IDs)
//!
//! dispatch id は一様ランダムな 128-bit UUID です。衝突確率はゼロとみなし、
//! 登録時の衝突は id 生成のバグとして扱います。
//!
//! # 学習ポイント
//! - `Id<T>` の `T` は PhantomData のマーカーで、種類の違う id を混ぜると
//!   コンパイルエラーになる
//! - 実行時の表現は素の `Uuid` のまま（ゼロコスト）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// id の種類ごとのマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// `Display` で使う接頭辞（例: "dispatch-"）
    fn prefix() -> &'static str;
}

/// ジェネリックな id 型
///
/// `T` はコンパイル時のタグに過ぎず、メモリを消費しません。
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> Id<T> {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    pub fn as_uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T: IdMarker> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.uuid)
    }
}

/// dispatch 用のマーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dispatch {}

impl IdMarker for Dispatch {
    fn prefix() -> &'static str {
        "dispatch-"
    }
}

/// workflow の実行インスタンス 1 つの識別子
pub type DispatchId = Id<Dispatch>;

/// タスクグラフ内のノードの識別子
///
/// ノード id はグラフ内でのみ一意です。dispatch を跨ぐときは
/// `(DispatchId, NodeId)` で指します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// sub-dispatch を生成した親 dispatch 側のタスクノード（"electron"）への参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElectronRef {
    pub dispatch_id: DispatchId,
    pub node_id: NodeId,
}

impl ElectronRef {
    pub fn new(dispatch_id: DispatchId, node_id: NodeId) -> Self {
        Self {
            dispatch_id,
            node_id,
        }
    }
}

impl fmt::Display for ElectronRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dispatch_id, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_id_display_has_prefix() {
        let uuid = Uuid::new_v4();
        let id = DispatchId::from_uuid(uuid);

        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(id.to_string(), format!("dispatch-{uuid}"));
    }

    #[test]
    fn dispatch_id_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id: DispatchId = uuid.into();

        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{uuid}\""));

        let back: DispatchId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<DispatchId>(), size_of::<Uuid>());
        assert_eq!(size_of::<Uuid>(), 16);
    }

    #[test]
    fn electron_ref_display_joins_dispatch_and_node() {
        let dispatch_id = DispatchId::from_uuid(Uuid::nil());
        let electron = ElectronRef::new(dispatch_id, NodeId::new(3));

        assert_eq!(
            electron.to_string(),
            "dispatch-00000000-0000-0000-0000-000000000000:3"
        );
    }
}

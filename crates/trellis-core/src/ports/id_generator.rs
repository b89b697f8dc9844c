//! IdGenerator port - dispatch ID 生成の抽象化
//!
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UuidGenerator**: 一様ランダムな 128-bit ID（UUID v4 形式、本番用）
//! - **SequenceGenerator**: 決められた順に ID を返す（テスト用）

use crate::domain::ids::DispatchId;

/// IdGenerator はグローバルに一意な dispatch ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_dispatch_id(&self) -> DispatchId;
}

/// UuidGenerator はランダムな UUID v4 の生成器
///
/// 衝突確率はゼロとみなします。登録時の重複は不変条件違反として報告し、
/// リトライはしません。
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl UuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidGenerator {
    fn generate_dispatch_id(&self) -> DispatchId {
        let uuid = uuid::Builder::from_random_bytes(rand::random()).into_uuid();
        DispatchId::from_uuid(uuid)
    }
}

/// 固定リストの ID を順に返し、尽きたら nil ID を返す（テスト用）
#[cfg(test)]
pub(crate) struct SequenceGenerator {
    ids: std::sync::Mutex<std::collections::VecDeque<DispatchId>>,
}

#[cfg(test)]
impl SequenceGenerator {
    pub(crate) fn new(ids: impl IntoIterator<Item = DispatchId>) -> Self {
        Self {
            ids: std::sync::Mutex::new(ids.into_iter().collect()),
        }
    }
}

#[cfg(test)]
impl IdGenerator for SequenceGenerator {
    fn generate_dispatch_id(&self) -> DispatchId {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| DispatchId::from_uuid(uuid::Uuid::nil()))
    }
}

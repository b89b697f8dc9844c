//! DispatchRegistry - 稼働中の dispatch と状態チャネルの台帳
//!
//! # 設計
//! - ランタイムごとに 1 つ、manager に注入する（グローバル状態なし）
//! - 参照は read lock を共有、register / deregister は write lock
//! - map の lock を `.await` を跨いで保持しない
//! - レコードはそれぞれ自前の async mutex の内側にあり、別 dispatch の更新と
//!   競合しない
//! - deregister でチャネルを close する（待っている受け手が終わる）

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use super::channel::StatusChannel;
use crate::domain::errors::DispatchError;
use crate::domain::ids::DispatchId;
use crate::domain::record::DispatchRecord;

/// 稼働中 dispatch レコードへの共有ハンドル
pub type DispatchHandle = Arc<Mutex<DispatchRecord>>;

struct Entry {
    record: DispatchHandle,
    channel: StatusChannel,
}

#[derive(Default)]
pub struct DispatchRegistry {
    entries: RwLock<HashMap<DispatchId, Entry>>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// レコードを登録し、状態チャネルを作る
    pub fn register(&self, record: DispatchRecord) -> Result<DispatchHandle, DispatchError> {
        let dispatch_id = record.dispatch_id;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&dispatch_id) {
            return Err(DispatchError::DuplicateDispatch(dispatch_id));
        }
        let handle = Arc::new(Mutex::new(record));
        entries.insert(
            dispatch_id,
            Entry {
                record: Arc::clone(&handle),
                channel: StatusChannel::new(dispatch_id),
            },
        );
        Ok(handle)
    }

    pub fn get(&self, dispatch_id: DispatchId) -> Result<DispatchHandle, DispatchError> {
        self.lookup(dispatch_id).map(|(record, _)| record)
    }

    pub fn channel_for(&self, dispatch_id: DispatchId) -> Result<StatusChannel, DispatchError> {
        self.lookup(dispatch_id).map(|(_, channel)| channel)
    }

    /// レコードとチャネルを 1 回の read lock で引く
    pub fn lookup(
        &self,
        dispatch_id: DispatchId,
    ) -> Result<(DispatchHandle, StatusChannel), DispatchError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&dispatch_id)
            .map(|entry| (Arc::clone(&entry.record), entry.channel.clone()))
            .ok_or(DispatchError::UnknownDispatch(dispatch_id))
    }

    /// dispatch を登録解除し、状態チャネルを close する
    ///
    /// 手元に残ったレコードのハンドルは引き続き使えます。チャネルのクローンは
    /// 積まれたイベントを取り切った後 `recv` が `None` を返し、`send` は
    /// `ChannelClosed` になります。
    pub fn deregister(&self, dispatch_id: DispatchId) -> Result<(), DispatchError> {
        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries
                .remove(&dispatch_id)
                .ok_or(DispatchError::UnknownDispatch(dispatch_id))?
        };
        entry.channel.close();
        Ok(())
    }

    pub fn contains(&self, dispatch_id: DispatchId) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&dispatch_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispatch_ids(&self) -> Vec<DispatchId> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().copied().collect()
    }
}

//! StatusChannel - dispatch ごとのノード状態遷移キュー
//!
//! 無制限の FIFO キューです。送り手はノード更新パイプライン、
//! 受け手は dispatch を駆動する実行エンジンです。
//!
//! # 設計
//! - Sender は全クローンで共有する 1 本だけ（`close` で破棄できる）
//! - `close` 後の `send` は `ChannelClosed`
//! - `close` 前に積まれたイベントは受け手が取り切れる
//!
//! # 使用例
//! ```ignore
//! let channel = manager.status_channel(dispatch_id)?;
//! while let Some(event) = channel.recv().await {
//!     println!("{} -> {}", event.node_id, event.status);
//! }
//! // finalize_dispatch で close されるとループを抜ける
//! ```

use std::sync::{Arc, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::errors::DispatchError;
use crate::domain::ids::{DispatchId, NodeId};
use crate::domain::status::NodeStatus;

/// ノード 1 つの状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub node_id: NodeId,
    pub status: NodeStatus,
}

impl StatusEvent {
    pub fn new(node_id: NodeId, status: NodeStatus) -> Self {
        Self { node_id, status }
    }
}

/// dispatch の状態チャネルへのハンドル（Clone 可能）
///
/// 全クローンが 1 つのキューを共有します。受信は async mutex で直列化され、
/// 複数の受け手が 1 イベントを奪い合うことはありません。
#[derive(Debug, Clone)]
pub struct StatusChannel {
    dispatch_id: DispatchId,
    tx: Arc<std::sync::Mutex<Option<mpsc::UnboundedSender<StatusEvent>>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<StatusEvent>>>,
}

impl StatusChannel {
    pub fn new(dispatch_id: DispatchId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            dispatch_id,
            tx: Arc::new(std::sync::Mutex::new(Some(tx))),
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    /// イベントを積む（ブロックしない）
    ///
    /// `close` 済みなら `ChannelClosed` を返します。
    pub fn send(&self, event: StatusEvent) -> Result<(), DispatchError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        tx.as_ref()
            .ok_or(DispatchError::ChannelClosed(self.dispatch_id))?
            .send(event)
            .map_err(|_| DispatchError::ChannelClosed(self.dispatch_id))
    }

    /// Sender を破棄する（全クローンに効く、二度目以降は何もしない）
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// 次のイベントを待つ
    ///
    /// `close` 済みで、キューが空になったら `None` を返します。
    pub async fn recv(&self) -> Option<StatusEvent> {
        self.rx.lock().await.recv().await
    }

    /// 積まれているイベントがあれば 1 つ取り出す
    ///
    /// キューが空、または他の受け手が受信中なら `None`。
    pub fn try_recv(&self) -> Option<StatusEvent> {
        let mut rx = self.rx.try_lock().ok()?;
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// ここまでに積まれたイベントをすべて取り出す
    pub fn drain(&self) -> Vec<StatusEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

//! Errors - エラー型と運用上の分類
//!
//! # 設計
//! - collaborator ごとのエラー（`CodecError` / `StoreError`）を `DispatchError` に集約
//! - `ErrorKind` はログの `kind` フィールドに出す運用分類

use thiserror::Error;

use super::ids::{DispatchId, NodeId};

/// ErrorKind はエラーの運用分類
///
/// # 分類
/// - Transient: 一時的なエラー（リトライで成功しうる）
/// - Permanent: 恒久的なエラー（呼び出し側のバグ、不変条件違反、終了済み dispatch）
/// - Infrastructure: インフラエラー（ストレージ等の collaborator の障害）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// workflow 定義をタスクグラフに変換できなかった
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed workflow definition: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("edge references unknown node: from={from}, to={to}")]
    InvalidEdge { from: NodeId, to: NodeId },

    #[error("workflow graph contains a cycle")]
    Cycle,
}

/// ストレージの失敗
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dispatch not found in storage: {0}")]
    NotFound(DispatchId),

    #[error("node {node_id} not found in stored dispatch {dispatch_id}")]
    NodeNotFound {
        dispatch_id: DispatchId,
        node_id: NodeId,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// DispatchError は dispatch manager が返すエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 指定された dispatch は登録されていない
    #[error("unknown dispatch: {0}")]
    UnknownDispatch(DispatchId),

    /// 登録時の id 衝突（id 生成のバグ）
    #[error("dispatch already registered: {0}")]
    DuplicateDispatch(DispatchId),

    #[error("node {node_id} not found in dispatch {dispatch_id}")]
    UnknownNode {
        dispatch_id: DispatchId,
        node_id: NodeId,
    },

    /// dispatch が finalize 済みで、状態チャネルが close されている
    #[error("status channel closed for dispatch {0}")]
    ChannelClosed(DispatchId),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// 終了した sub-dispatch の親ノード更新に失敗した
    #[error("failed to propagate {dispatch_id} into parent {parent_id}")]
    Propagation {
        dispatch_id: DispatchId,
        parent_id: DispatchId,
        #[source]
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownDispatch(_)
            | DispatchError::DuplicateDispatch(_)
            | DispatchError::UnknownNode { .. }
            | DispatchError::ChannelClosed(_)
            | DispatchError::Codec(_) => ErrorKind::Permanent,
            DispatchError::Store(_) => ErrorKind::Infrastructure,
            DispatchError::Propagation { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn propagation_error_takes_kind_of_cause() {
        let id = DispatchId::from_uuid(Uuid::new_v4());
        let parent = DispatchId::from_uuid(Uuid::new_v4());
        let err = DispatchError::Propagation {
            dispatch_id: id,
            parent_id: parent,
            source: Box::new(DispatchError::UnknownDispatch(parent)),
        };

        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(err.to_string(), format!("failed to propagate {id} into parent {parent}"));
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), format!("unknown dispatch: {parent}"));
    }

    #[test]
    fn closed_channel_is_permanent() {
        let id = DispatchId::from_uuid(Uuid::new_v4());
        assert_eq!(DispatchError::ChannelClosed(id).kind(), ErrorKind::Permanent);
    }

    #[test]
    fn store_errors_are_infrastructure() {
        let err: DispatchError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.to_string(), "storage backend error: disk full");
    }
}

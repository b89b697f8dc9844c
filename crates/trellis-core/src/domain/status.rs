//! Status - ノードと dispatch の実行状態
//!
//! # 設計
//! - ノード状態と dispatch 状態は独立（dispatch 状態をノードから集計しない）
//! - sub-dispatch の状態は `as_parent_node_status` で親ノードの状態に写す

use serde::{Deserialize, Serialize};
use std::fmt;

/// タスクグラフ内のノード 1 つの状態
///
/// # 状態遷移（実行エンジンが駆動）
/// - New -> Running -> Completed
/// - New -> Running -> Failed / Cancelled
/// - Completed -> PostprocessingFailed（sub-workflow の後処理）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    New,
    Running,
    Completed,
    Failed,
    Cancelled,
    PostprocessingFailed,
}

impl NodeStatus {
    /// 終端状態か（これ以上遷移しない）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Completed
                | NodeStatus::Failed
                | NodeStatus::Cancelled
                | NodeStatus::PostprocessingFailed
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::New => "NEW",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Completed => "COMPLETED",
            NodeStatus::Failed => "FAILED",
            NodeStatus::Cancelled => "CANCELLED",
            NodeStatus::PostprocessingFailed => "POSTPROCESSING_FAILED",
        };
        f.write_str(s)
    }
}

/// dispatch 全体の状態（ノードの状態とは独立）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    New,
    Dispatching,
    Running,
    PendingPostprocessing,
    Completed,
    Failed,
    Cancelled,
    PostprocessingFailed,
}

impl DispatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DispatchStatus::Completed
                | DispatchStatus::Failed
                | DispatchStatus::Cancelled
                | DispatchStatus::PostprocessingFailed
        )
    }

    /// この dispatch が sub-workflow のとき、親 dispatch 側の生成元ノードが取る状態
    ///
    /// 後処理は sub-workflow の内部の話なので、後処理の失敗は親には
    /// 単なる失敗として見せます。
    pub fn as_parent_node_status(self) -> NodeStatus {
        match self {
            DispatchStatus::New => NodeStatus::New,
            DispatchStatus::Dispatching
            | DispatchStatus::Running
            | DispatchStatus::PendingPostprocessing => NodeStatus::Running,
            DispatchStatus::Completed => NodeStatus::Completed,
            DispatchStatus::Failed | DispatchStatus::PostprocessingFailed => NodeStatus::Failed,
            DispatchStatus::Cancelled => NodeStatus::Cancelled,
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchStatus::New => "NEW",
            DispatchStatus::Dispatching => "DISPATCHING",
            DispatchStatus::Running => "RUNNING",
            DispatchStatus::PendingPostprocessing => "PENDING_POSTPROCESSING",
            DispatchStatus::Completed => "COMPLETED",
            DispatchStatus::Failed => "FAILED",
            DispatchStatus::Cancelled => "CANCELLED",
            DispatchStatus::PostprocessingFailed => "POSTPROCESSING_FAILED",
        };
        f.write_str(s)
    }
}

//! WorkflowCodec port - workflow 定義をタスクグラフへ変換する

use crate::domain::errors::CodecError;
use crate::domain::record::Workflow;

/// WorkflowCodec はシリアライズされた workflow 定義を `Workflow` に変換する
///
/// 返すグラフのノードはすべて NEW から始まります。
pub trait WorkflowCodec: Send + Sync {
    fn decode(&self, definition: &str) -> Result<Workflow, CodecError>;
}

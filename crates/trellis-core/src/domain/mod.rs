//! Domain model (ids, statuses, task graphs, dispatch records, errors).
//!
//! I/O を持たない純粋な型のみ。永続化や時刻は ports 経由で扱います。

pub mod errors;
pub mod graph;
pub mod ids;
pub mod record;
pub mod result;
pub mod spec;
pub mod status;

pub use self::errors::{CodecError, DispatchError, ErrorKind, StoreError};
pub use self::graph::{Node, NodeCounts, TaskGraph};
pub use self::ids::{DispatchId, ElectronRef, NodeId};
pub use self::record::{DispatchRecord, Workflow};
pub use self::result::NodeResult;
pub use self::spec::{EdgeSpec, TaskSpec, WorkflowSpec};
pub use self::status::{DispatchStatus, NodeStatus};

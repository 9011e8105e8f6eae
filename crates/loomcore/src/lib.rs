//! Core abstractions for the loomflow engine
//!
//! Graph model, dynamic values, the handler contract, run records and the
//! event stream. Everything the runtime and node library build on.

mod error;
mod events;
mod graph;
mod handler;
mod record;
mod validate;
mod value;

pub use error::{FlowError, NodeError, ValidationError};
pub use events::{EventBus, EventEmitter, ExecutionEvent};
pub use graph::{kinds, Edge, FlowGraph, NodeSpec};
pub use handler::{HandlerContext, HandlerMetadata, HandlerOutcome, NodeHandler};
pub use record::{FlowRuntimeResult, NodeRuntime, NodeStatus, RunId, RunStatus};
pub use validate::ValidationReport;
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

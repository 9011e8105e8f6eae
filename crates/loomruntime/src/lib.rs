//! Flow execution runtime
//!
//! The scheduler that walks a validated graph, the handler registry it
//! dispatches through, edge activation, and the single-writer run recorder.

mod edges;
mod executor;
mod recorder;
mod registry;
mod runtime;

pub use edges::{resolve_outgoing, EdgeActivation, EdgeState};
pub use executor::FlowExecutor;
pub use recorder::RunRecorder;
pub use registry::HandlerRegistry;
pub use runtime::{FlowRuntime, RuntimeConfig};

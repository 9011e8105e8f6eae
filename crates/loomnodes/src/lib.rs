//! Built-in node handler library
//!
//! One handler per declared node kind. All of them are thin, config-driven
//! implementations of the generic handler contract; a product embedding the
//! engine replaces any of them by registering its own handler for the kind.

mod branch;
mod code;
mod control;
mod data;
mod knowledge;
mod llm;
mod mcp;
mod template;

pub use branch::{BranchHandler, IntentHandler};
pub use code::CodeHandler;
pub use control::{EndHandler, StartHandler};
pub use data::{
    DataClarifyHandler, DataQueryHandler, DataVisualizeHandler, ObjectQueryHandler,
    TableSelectHandler,
};
pub use knowledge::KnowledgeHandler;
pub use llm::{AgentHandler, LlmHandler};
pub use mcp::McpHandler;

use loomruntime::HandlerRegistry;
use std::sync::Arc;

/// Register every built-in handler with a registry
pub fn register_all(registry: &mut HandlerRegistry) {
    registry.register(Arc::new(control::StartHandler));
    registry.register(Arc::new(control::EndHandler));
    registry.register(Arc::new(branch::BranchHandler));
    registry.register(Arc::new(branch::IntentHandler));
    registry.register(Arc::new(llm::LlmHandler::new()));
    registry.register(Arc::new(llm::AgentHandler::new()));
    registry.register(Arc::new(knowledge::KnowledgeHandler::new()));
    registry.register(Arc::new(data::ObjectQueryHandler));
    registry.register(Arc::new(data::TableSelectHandler));
    registry.register(Arc::new(data::DataClarifyHandler));
    registry.register(Arc::new(data::DataQueryHandler));
    registry.register(Arc::new(data::DataVisualizeHandler));
    registry.register(Arc::new(code::CodeHandler));
    registry.register(Arc::new(mcp::McpHandler::new()));
}

use crate::{events::EventEmitter, NodeError, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Contract every executable node kind implements. Handlers are stateless
/// singletons registered once at bootstrap; they receive resolved input and
/// configuration and return values only, never touching shared run state.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Kind identifier this handler serves (e.g. "llm", "branch")
    fn kind(&self) -> &str;

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError>;

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata::default()
    }
}

/// Descriptive metadata for registry listings
#[derive(Debug, Clone)]
pub struct HandlerMetadata {
    pub description: String,
    pub category: String,
}

impl Default for HandlerMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Everything a handler sees for one node invocation
#[derive(Clone)]
pub struct HandlerContext {
    pub node_id: String,

    /// Static per-node configuration from the graph definition
    pub config: HashMap<String, Value>,

    /// Resolved input: the selected predecessor's output, or an object
    /// keyed by source node id when several predecessors were selected
    pub input: Value,

    /// Live log line emitter for streaming consumers
    pub events: EventEmitter,

    /// Run-wide cancellation; handlers doing long work should observe it
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl HandlerContext {
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config
            .get(name)
            .ok_or_else(|| NodeError::Configuration(format!("Missing config: {}", name)))
    }

    pub fn require_config_str(&self, name: &str) -> Result<&str, NodeError> {
        self.require_config(name)?.as_str().ok_or_else(|| {
            NodeError::Configuration(format!("Config '{}' must be a string", name))
        })
    }

    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }

    /// Best-effort text view of the input, for prompt-like handlers
    pub fn input_text(&self) -> Option<String> {
        if let Some(s) = self.input.as_str() {
            return Some(s.to_string());
        }
        for key in ["query", "text", "message"] {
            if let Some(v) = self.input.get(key) {
                if let Some(s) = v.as_str() {
                    return Some(s.to_string());
                }
            }
        }
        None
    }
}

/// What a handler hands back to the scheduler
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    /// Value passed along selected outgoing edges
    pub output: Value,

    /// Selected source handles; present only for routing kinds. May name
    /// several handles at once.
    pub branch: Option<Vec<String>>,

    /// Log lines recorded into the node trace
    pub logs: Vec<String>,
}

impl HandlerOutcome {
    pub fn new(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            branch: None,
            logs: Vec::new(),
        }
    }

    pub fn with_branch(mut self, handles: Vec<String>) -> Self {
        self.branch = Some(handles);
        self
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }
}

use loomcore::{FlowError, HandlerMetadata, NodeHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of node handlers keyed by kind string. Populated once at
/// bootstrap, read-only while runs execute.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        let kind = handler.kind().to_string();
        tracing::info!("Registering handler for kind: {}", kind);
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for a declared kind
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn NodeHandler>, FlowError> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| FlowError::HandlerNotFound(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn metadata(&self, kind: &str) -> Option<HandlerMetadata> {
        self.handlers.get(kind).map(|h| h.metadata())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

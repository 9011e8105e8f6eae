use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known node kinds. The set is open: the registry accepts any kind
/// string, these are the ones the built-in library covers.
pub mod kinds {
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const LLM: &str = "llm";
    pub const KNOWLEDGE: &str = "knowledge";
    pub const OBJECT_QUERY: &str = "object-query";
    pub const TABLE_SELECT: &str = "table-select";
    pub const DATA_CLARIFY: &str = "data-clarify";
    pub const DATA_QUERY: &str = "data-query";
    pub const DATA_VISUALIZE: &str = "data-visualize";
    pub const AGENT: &str = "agent";
    pub const BRANCH: &str = "branch";
    pub const INTENT_RECOGNIZE: &str = "intent-recognize";
    pub const CODE: &str = "code";
    pub const MCP: &str = "mcp";
}

/// A typed unit of work in the flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: String::new(),
            config: HashMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// A directed data/control link between two nodes. An edge carrying a
/// `source_handle` is conditional: it only activates when its source's
/// handler selects that handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub target: String,
}

impl Edge {
    pub fn is_conditional(&self) -> bool {
        self.source_handle.is_some()
    }
}

/// Declarative flow graph: immutable during a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeSpec) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Connect two nodes with an unconditional edge
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        let id = format!("e-{}-{}", source, target);
        self.edges.push(Edge {
            id,
            source,
            source_handle: None,
            target,
        });
    }

    /// Connect two nodes with a conditional edge keyed by `handle`
    pub fn connect_handle(
        &mut self,
        source: impl Into<String>,
        handle: impl Into<String>,
        target: impl Into<String>,
    ) {
        let source = source.into();
        let handle = handle.into();
        let target = target.into();
        let id = format!("e-{}-{}-{}", source, handle, target);
        self.edges.push(Edge {
            id,
            source,
            source_handle: Some(handle),
            target,
        });
    }

    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn outgoing(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    pub fn incoming(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.target == id).collect()
    }

    pub fn start_node(&self) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.kind == kinds::START)
    }

    pub fn end_nodes(&self) -> Vec<&NodeSpec> {
        self.nodes.iter().filter(|n| n.kind == kinds::END).collect()
    }
}

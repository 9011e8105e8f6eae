use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No handler registered for kind: {0}")]
    HandlerNotFound(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors a node handler may return; the scheduler turns these into a
/// `failed` node record rather than letting them escape the run.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input for '{field}': expected {expected}")]
    InvalidInput { field: String, expected: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Upstream call failed: {0}")]
    Upstream(String),

    #[error("Timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Cancelled")]
    Cancelled,
}

/// Structural problems detected before any node executes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Graph has no start node")]
    MissingStart,

    #[error("Graph has {0} start nodes, expected exactly one")]
    MultipleStarts(usize),

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("Edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },

    #[error("Node '{0}' has no incoming edges")]
    OrphanNode(String),

    #[error("Node '{node}' has duplicate branch handle '{handle}'")]
    DuplicateHandle { node: String, handle: String },

    #[error("Duplicate node id '{0}'")]
    DuplicateNodeId(String),
}

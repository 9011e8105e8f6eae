use crate::{registry::HandlerRegistry, FlowExecutor};
use loomcore::{EventBus, FlowError, FlowGraph, FlowRuntimeResult, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main entry point for executing flow graphs
pub struct FlowRuntime {
    registry: Arc<HandlerRegistry>,
    executor: Arc<FlowExecutor>,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a runtime with default settings and an empty registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::new()), RuntimeConfig::default())
    }

    pub fn with_registry(registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
        let executor = Arc::new(FlowExecutor::new(
            config.max_parallel_nodes,
            config.node_timeout_ms,
        ));
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            executor,
            event_bus,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Execute a graph with the given initial input. Synchronous from the
    /// caller's perspective; independent branches run concurrently inside.
    pub async fn execute(
        &self,
        graph: &FlowGraph,
        initial_input: Value,
    ) -> Result<FlowRuntimeResult, FlowError> {
        self.execute_cancellable(graph, initial_input, CancellationToken::new())
            .await
    }

    /// Execute with a caller-owned cancellation token. Cancelling finalizes
    /// the run as failed with every pending node skipped.
    pub async fn execute_cancellable(
        &self,
        graph: &FlowGraph,
        initial_input: Value,
        cancel: CancellationToken,
    ) -> Result<FlowRuntimeResult, FlowError> {
        self.executor
            .execute(graph, &self.registry, &self.event_bus, initial_input, cancel)
            .await
    }

    /// Subscribe to the incremental event stream for live progress display
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<loomcore::ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_parallel_nodes: usize,
    pub event_buffer_size: usize,
    /// Per-node wall-clock limit; exceeded nodes fail with a timeout error
    pub node_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: 10,
            event_buffer_size: 1000,
            node_timeout_ms: None,
        }
    }
}

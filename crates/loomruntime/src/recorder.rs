use chrono::Utc;
use loomcore::{
    EventBus, ExecutionEvent, FlowGraph, FlowRuntimeResult, NodeRuntime, NodeStatus, RunId,
    RunStatus, Value,
};
use std::collections::HashMap;

/// Single writer of the per-run record. Handlers never touch this; the
/// scheduler routes every transition through here so concurrent branches
/// cannot race on the result.
pub struct RunRecorder<'a> {
    run_id: RunId,
    bus: &'a EventBus,
    started_at: chrono::DateTime<Utc>,
    node_order: Vec<String>,
    node_results: HashMap<String, NodeRuntime>,
    warnings: Vec<String>,
}

impl<'a> RunRecorder<'a> {
    pub fn new(run_id: RunId, bus: &'a EventBus, warnings: Vec<String>) -> Self {
        let started_at = Utc::now();
        bus.emit(ExecutionEvent::RunStarted {
            run_id,
            timestamp: started_at,
        });
        Self {
            run_id,
            bus,
            started_at,
            node_order: Vec::new(),
            node_results: HashMap::new(),
            warnings,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("run {}: {}", self.run_id, message);
        self.warnings.push(message);
    }

    pub fn is_finalized(&self, node_id: &str) -> bool {
        self.node_results
            .get(node_id)
            .map(|r| r.status.is_terminal())
            .unwrap_or(false)
    }

    pub fn any_failed(&self) -> bool {
        self.node_results
            .values()
            .any(|r| r.status == NodeStatus::Failed)
    }

    pub fn node_started(&mut self, node_id: &str, node_kind: &str, input: Value) {
        self.node_results.insert(
            node_id.to_string(),
            NodeRuntime::running(node_id, node_kind, input),
        );
        self.bus.emit(ExecutionEvent::NodeStarted {
            run_id: self.run_id,
            node_id: node_id.to_string(),
            node_kind: node_kind.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn node_succeeded(
        &mut self,
        node_id: &str,
        output: Value,
        logs: Vec<String>,
        duration_ms: u64,
    ) {
        self.finalize_node(node_id, NodeStatus::Success, output, logs, duration_ms);
    }

    pub fn node_failed(&mut self, node_id: &str, error: String, duration_ms: u64) {
        self.finalize_node(node_id, NodeStatus::Failed, Value::Null, vec![error], duration_ms);
    }

    /// Record a node that resolved without running
    pub fn node_skipped(&mut self, node_id: &str, node_kind: &str) {
        let runtime = NodeRuntime::skipped(node_id, node_kind);
        self.node_results.insert(node_id.to_string(), runtime.clone());
        self.node_order.push(node_id.to_string());
        self.bus.emit(ExecutionEvent::NodeFinalized {
            run_id: self.run_id,
            runtime,
            timestamp: Utc::now(),
        });
    }

    fn finalize_node(
        &mut self,
        node_id: &str,
        status: NodeStatus,
        output: Value,
        logs: Vec<String>,
        duration_ms: u64,
    ) {
        let Some(runtime) = self.node_results.get_mut(node_id) else {
            return;
        };
        let ended_at = Utc::now();
        runtime.status = status;
        runtime.output = output;
        runtime.logs.extend(logs);
        runtime.ended_at = Some(ended_at);
        runtime.duration_ms = duration_ms;

        let snapshot = runtime.clone();
        self.node_order.push(node_id.to_string());
        self.bus.emit(ExecutionEvent::NodeFinalized {
            run_id: self.run_id,
            runtime: snapshot,
            timestamp: ended_at,
        });
    }

    /// Close the run: derive overall status and terminal output
    pub fn finalize(self, graph: &FlowGraph, cancelled: bool) -> FlowRuntimeResult {
        let ended_at = Utc::now();
        let failed = cancelled || self.any_failed();
        let status = if failed {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        let final_output = if failed {
            Value::Null
        } else {
            aggregate_final_output(graph, &self.node_results)
        };

        let duration_ms = (ended_at - self.started_at).num_milliseconds().max(0) as u64;
        self.bus.emit(ExecutionEvent::RunCompleted {
            run_id: self.run_id,
            status,
            duration_ms,
            timestamp: ended_at,
        });

        FlowRuntimeResult {
            run_id: self.run_id,
            status,
            started_at: self.started_at,
            ended_at,
            node_order: self.node_order,
            node_results: self.node_results,
            warnings: self.warnings,
            final_output,
        }
    }
}

/// Merge outputs of the successful end nodes: a single end passes its
/// output through unchanged, several are keyed by end-node id.
fn aggregate_final_output(
    graph: &FlowGraph,
    node_results: &HashMap<String, NodeRuntime>,
) -> Value {
    let mut succeeded: Vec<(&str, &Value)> = graph
        .end_nodes()
        .into_iter()
        .filter_map(|node| {
            node_results
                .get(&node.id)
                .filter(|r| r.status == NodeStatus::Success)
                .map(|r| (node.id.as_str(), &r.output))
        })
        .collect();

    match succeeded.len() {
        0 => Value::Null,
        1 => succeeded.remove(0).1.clone(),
        _ => Value::object(
            succeeded
                .into_iter()
                .map(|(id, output)| (id.to_string(), output.clone())),
        ),
    }
}

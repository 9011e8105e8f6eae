use crate::edges::{resolve_outgoing, EdgeActivation, EdgeState};
use crate::recorder::RunRecorder;
use crate::registry::HandlerRegistry;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use loomcore::{
    Edge, EventBus, FlowError, FlowGraph, FlowRuntimeResult, HandlerContext, HandlerOutcome,
    NodeError, NodeStatus, RunId, Value,
};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

type NodeCompletion = (String, Result<HandlerOutcome, NodeError>, u64);

/// Drives one run of a flow graph: readiness tracking by edge resolution,
/// concurrent dispatch of independent nodes, skip propagation through
/// pruned subgraphs, fail-fast on handler errors.
pub struct FlowExecutor {
    max_parallel: usize,
    node_timeout_ms: Option<u64>,
}

impl FlowExecutor {
    pub fn new(max_parallel: usize, node_timeout_ms: Option<u64>) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            node_timeout_ms,
        }
    }

    /// Execute a graph to completion. Validation failures return an error
    /// before any node runs; every runtime failure is reported through the
    /// returned record instead.
    pub async fn execute(
        &self,
        graph: &FlowGraph,
        registry: &HandlerRegistry,
        event_bus: &EventBus,
        initial_input: Value,
        cancel: CancellationToken,
    ) -> Result<FlowRuntimeResult, FlowError> {
        let report = graph.validate()?;
        let start_id = graph
            .start_node()
            .map(|n| n.id.clone())
            .ok_or_else(|| FlowError::Execution("graph has no start node".to_string()))?;

        let run_id = RunId::new_v4();
        tracing::info!("starting run {} ({} nodes)", run_id, graph.nodes.len());

        let mut recorder = RunRecorder::new(run_id, event_bus, report.warnings.clone());
        let mut state = RunState::new(graph, &start_id, initial_input);
        let mut running: FuturesUnordered<BoxFuture<'static, NodeCompletion>> =
            FuturesUnordered::new();

        // Halted: a node failed or the run was cancelled. In-flight nodes
        // still drain and are recorded, nothing new is dispatched.
        let mut halted = false;
        let mut cancelled = false;

        loop {
            if !cancelled && cancel.is_cancelled() {
                cancelled = true;
                halted = true;
                recorder.warn("run cancelled");
            }

            while !halted && running.len() < self.max_parallel {
                let Some(node_id) = state.ready.pop_front() else {
                    break;
                };
                let Some(node) = graph.node(&node_id) else {
                    continue;
                };
                let input = state.resolve_input(&node_id);

                let handler = match registry.resolve(&node.kind) {
                    Ok(handler) => handler,
                    Err(_) => {
                        recorder.node_started(&node_id, &node.kind, input);
                        recorder.node_failed(
                            &node_id,
                            format!("no handler registered for kind '{}'", node.kind),
                            0,
                        );
                        halted = true;
                        let activation =
                            resolve_outgoing(graph, &node_id, NodeStatus::Failed, None);
                        state.apply(&mut recorder, activation, None, halted);
                        break;
                    }
                };

                recorder.node_started(&node_id, &node.kind, input.clone());
                let ctx = HandlerContext {
                    node_id: node_id.clone(),
                    config: node.config.clone(),
                    input,
                    events: event_bus.create_emitter(run_id, node_id.clone()),
                    cancellation: cancel.child_token(),
                };

                running.push(self.spawn_node(node_id, handler, ctx));
            }

            if running.is_empty() {
                if halted || state.ready.is_empty() {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    halted = true;
                    recorder.warn("run cancelled");
                }
                Some((node_id, exec_result, duration_ms)) = running.next() => {
                    match exec_result {
                        Ok(outcome) => {
                            tracing::info!("node {} completed in {}ms", node_id, duration_ms);
                            let activation = resolve_outgoing(
                                graph,
                                &node_id,
                                NodeStatus::Success,
                                outcome.branch.as_deref(),
                            );
                            recorder.node_succeeded(
                                &node_id,
                                outcome.output.clone(),
                                outcome.logs,
                                duration_ms,
                            );
                            if let Some(warning) = activation.warning.clone() {
                                recorder.warn(warning);
                            }
                            state.apply(&mut recorder, activation, Some(&outcome.output), halted);
                        }
                        Err(e) => {
                            tracing::error!("node {} failed: {}", node_id, e);
                            recorder.node_failed(&node_id, e.to_string(), duration_ms);
                            halted = true;
                            let activation =
                                resolve_outgoing(graph, &node_id, NodeStatus::Failed, None);
                            state.apply(&mut recorder, activation, None, halted);
                        }
                    }
                }
            }
        }

        // A halted run leaves part of the graph unresolved; every reachable
        // node still ends in a terminal state, never pending.
        for node in &graph.nodes {
            if report.reachable.contains(&node.id) && !recorder.is_finalized(&node.id) {
                recorder.node_skipped(&node.id, &node.kind);
            }
        }

        Ok(recorder.finalize(graph, cancelled))
    }

    fn spawn_node(
        &self,
        node_id: String,
        handler: std::sync::Arc<dyn loomcore::NodeHandler>,
        ctx: HandlerContext,
    ) -> BoxFuture<'static, NodeCompletion> {
        let task = {
            let node_id = node_id.clone();
            async move {
                let start = Instant::now();
                let result = handler.run(ctx).await;
                (node_id, result, start.elapsed().as_millis() as u64)
            }
        };
        let handle = tokio::spawn(task);

        match self.node_timeout_ms {
            Some(timeout_ms) => Box::pin(async move {
                match timeout(Duration::from_millis(timeout_ms), handle).await {
                    Ok(Ok(completion)) => completion,
                    Ok(Err(e)) => (
                        node_id,
                        Err(NodeError::ExecutionFailed(format!("task join error: {}", e))),
                        0,
                    ),
                    Err(_) => (node_id, Err(NodeError::Timeout { ms: timeout_ms }), timeout_ms),
                }
            }),
            None => Box::pin(async move {
                match handle.await {
                    Ok(completion) => completion,
                    Err(e) => (
                        node_id,
                        Err(NodeError::ExecutionFailed(format!("task join error: {}", e))),
                        0,
                    ),
                }
            }),
        }
    }
}

/// Per-node readiness bookkeeping for one run
struct NodeProgress {
    incoming_total: usize,
    resolved: usize,
    selected: usize,
    /// Outputs carried over selected incoming edges, keyed by source id
    inputs: Vec<(String, Value)>,
}

struct RunState<'g> {
    graph: &'g FlowGraph,
    edges_by_id: HashMap<&'g str, &'g Edge>,
    progress: HashMap<String, NodeProgress>,
    ready: VecDeque<String>,
}

impl<'g> RunState<'g> {
    fn new(graph: &'g FlowGraph, start_id: &str, initial_input: Value) -> Self {
        let edges_by_id = graph
            .edges
            .iter()
            .map(|e| (e.id.as_str(), e))
            .collect::<HashMap<_, _>>();
        let mut progress: HashMap<String, NodeProgress> = graph
            .nodes
            .iter()
            .map(|n| {
                (
                    n.id.clone(),
                    NodeProgress {
                        incoming_total: graph.incoming(&n.id).len(),
                        resolved: 0,
                        selected: 0,
                        inputs: Vec::new(),
                    },
                )
            })
            .collect();

        // Start has no incoming edges and is trivially ready with the
        // caller-provided input.
        let mut ready = VecDeque::new();
        if let Some(p) = progress.get_mut(start_id) {
            p.inputs.push((String::new(), initial_input));
            ready.push_back(start_id.to_string());
        }

        Self {
            graph,
            edges_by_id,
            progress,
            ready,
        }
    }

    /// One selected predecessor passes its output through unchanged;
    /// several merge into one object keyed by source node id.
    fn resolve_input(&mut self, node_id: &str) -> Value {
        let Some(p) = self.progress.get_mut(node_id) else {
            return Value::Null;
        };
        let mut inputs = std::mem::take(&mut p.inputs);
        match inputs.len() {
            0 => Value::Null,
            1 => inputs.remove(0).1,
            _ => Value::object(inputs),
        }
    }

    /// Fold an edge activation into downstream readiness. Nodes whose
    /// incoming edges all resolved without a single selection transition
    /// straight to skipped, and the skip cascades through their subgraph.
    fn apply(
        &mut self,
        recorder: &mut RunRecorder<'_>,
        activation: EdgeActivation,
        output: Option<&Value>,
        halted: bool,
    ) {
        let mut pending: Vec<(EdgeActivation, Option<Value>)> =
            vec![(activation, output.cloned())];

        while let Some((activation, output)) = pending.pop() {
            for (edge_id, edge_state) in activation.states {
                let Some(edge) = self.edges_by_id.get(edge_id.as_str()).copied() else {
                    continue;
                };
                let Some(p) = self.progress.get_mut(&edge.target) else {
                    continue;
                };

                p.resolved += 1;
                if edge_state == EdgeState::Selected {
                    p.selected += 1;
                    if let Some(value) = &output {
                        if value.is_null() {
                            recorder.warn(format!(
                                "node '{}' produced no output consumed by '{}'",
                                edge.source, edge.target
                            ));
                        }
                        p.inputs.push((edge.source.clone(), value.clone()));
                    }
                }

                if p.resolved < p.incoming_total {
                    continue;
                }

                if p.selected > 0 {
                    if !halted {
                        self.ready.push_back(edge.target.clone());
                    }
                } else {
                    let kind = self
                        .graph
                        .node(&edge.target)
                        .map(|n| n.kind.clone())
                        .unwrap_or_default();
                    recorder.node_skipped(&edge.target, &kind);
                    let cascade =
                        resolve_outgoing(self.graph, &edge.target, NodeStatus::Skipped, None);
                    pending.push((cascade, None));
                }
            }
        }
    }
}

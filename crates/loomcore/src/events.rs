use crate::{NodeRuntime, RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while a run executes. `NodeFinalized` carries the full
/// node trace so live consumers render incrementally without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        node_id: String,
        node_kind: String,
        timestamp: DateTime<Utc>,
    },
    NodeFinalized {
        run_id: RunId,
        runtime: NodeRuntime,
        timestamp: DateTime<Utc>,
    },
    NodeLog {
        run_id: RunId,
        node_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        status: RunStatus,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Emitter handed to handlers for live log lines
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    node_id: String,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, node_id: String, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            run_id,
            node_id,
            sender,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let _ = self.sender.send(ExecutionEvent::NodeLog {
            run_id: self.run_id,
            node_id: self.node_id.clone(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}

/// In-process broadcast bus for the streaming variant
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, run_id: RunId, node_id: impl Into<String>) -> EventEmitter {
        EventEmitter::new(run_id, node_id.into(), self.sender.clone())
    }
}

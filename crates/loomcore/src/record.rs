use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type RunId = Uuid;

/// Per-run state machine of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Failed | NodeStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Execution trace of one node within one run. Created when the node first
/// becomes eligible (running or skipped), immutable once finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRuntime {
    pub node_id: String,
    pub node_kind: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub logs: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl NodeRuntime {
    pub fn running(node_id: impl Into<String>, node_kind: impl Into<String>, input: Value) -> Self {
        Self {
            node_id: node_id.into(),
            node_kind: node_kind.into(),
            status: NodeStatus::Running,
            input,
            output: Value::Null,
            logs: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: 0,
        }
    }

    pub fn skipped(node_id: impl Into<String>, node_kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            node_id: node_id.into(),
            node_kind: node_kind.into(),
            status: NodeStatus::Skipped,
            input: Value::Null,
            output: Value::Null,
            logs: Vec::new(),
            started_at: now,
            ended_at: Some(now),
            duration_ms: 0,
        }
    }
}

/// Aggregate record of one run: statuses, traces, resolution order,
/// warnings and the terminal output. Owned by exactly one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRuntimeResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Node ids in the order they were finalized, not declared
    pub node_order: Vec<String>,
    pub node_results: HashMap<String, NodeRuntime>,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub final_output: Value,
}

impl FlowRuntimeResult {
    pub fn node(&self, id: &str) -> Option<&NodeRuntime> {
        self.node_results.get(id)
    }

    pub fn node_status(&self, id: &str) -> Option<NodeStatus> {
        self.node_results.get(id).map(|r| r.status)
    }
}

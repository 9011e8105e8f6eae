use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};
use serde_json::json;

/// Tool invocation against an MCP endpoint via JSON-RPC `tools/call`.
///
/// Config: `endpoint`, `tool`, optional `arguments` (defaults to the
/// node input).
pub struct McpHandler {
    client: reqwest::Client,
}

impl McpHandler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for McpHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for McpHandler {
    fn kind(&self) -> &str {
        kinds::MCP
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let endpoint = ctx.require_config_str("endpoint")?;
        let tool = ctx.require_config_str("tool")?;
        let arguments = ctx
            .config
            .get("arguments")
            .map(Value::to_json)
            .unwrap_or_else(|| ctx.input.to_json());

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments},
        });

        ctx.events.info(format!("calling tool '{}'", tool));

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
            response = self.client.post(endpoint).json(&body).send() => response
                .map_err(|e| NodeError::Upstream(format!("tool call failed: {}", e)))?,
        };

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NodeError::Upstream(format!("invalid tool response: {}", e)))?;
        if !status.is_success() {
            return Err(NodeError::Upstream(format!(
                "tool endpoint returned {}: {}",
                status, payload
            )));
        }
        if let Some(error) = payload.get("error") {
            return Err(NodeError::ExecutionFailed(format!(
                "tool '{}' returned an error: {}",
                tool, error
            )));
        }

        let result = payload
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(HandlerOutcome::new(Value::Json(result)))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Invoke a tool over the MCP JSON-RPC protocol".to_string(),
            category: "integration".to_string(),
        }
    }
}

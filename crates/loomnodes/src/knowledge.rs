use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};
use serde_json::json;

/// Retrieval call against a knowledge-base endpoint.
///
/// Config: `base_url`, `dataset_id`, optional `api_key`, `top_k`
/// (default 4). The query is taken from the input text.
pub struct KnowledgeHandler {
    client: reqwest::Client,
}

impl KnowledgeHandler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for KnowledgeHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for KnowledgeHandler {
    fn kind(&self) -> &str {
        kinds::KNOWLEDGE
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let base_url = ctx.require_config_str("base_url")?;
        let dataset_id = ctx.require_config_str("dataset_id")?;
        let top_k = ctx
            .config
            .get("top_k")
            .and_then(|v| v.as_f64())
            .unwrap_or(4.0) as u32;
        let query = ctx
            .input_text()
            .ok_or_else(|| NodeError::MissingInput("query".to_string()))?;

        let url = format!("{}/retrieval", base_url.trim_end_matches('/'));
        let body = json!({
            "dataset_id": dataset_id,
            "query": query,
            "top_k": top_k,
        });

        ctx.events
            .info(format!("retrieving top {} chunks from {}", top_k, dataset_id));

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = ctx.config.get("api_key").and_then(|k| k.as_str()) {
            request = request.bearer_auth(api_key);
        }

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
            response = request.send() => response
                .map_err(|e| NodeError::Upstream(format!("retrieval request failed: {}", e)))?,
        };

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NodeError::Upstream(format!("invalid retrieval response: {}", e)))?;
        if !status.is_success() {
            return Err(NodeError::Upstream(format!(
                "retrieval endpoint returned {}: {}",
                status, payload
            )));
        }

        let chunks = payload.get("records").cloned().unwrap_or(payload);
        Ok(HandlerOutcome::new(Value::object([
            ("query".to_string(), Value::String(query)),
            ("chunks".to_string(), Value::Json(chunks)),
        ])))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Retrieve matching chunks from a knowledge base".to_string(),
            category: "data".to_string(),
        }
    }
}

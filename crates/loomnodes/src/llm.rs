use crate::template::render_template;
use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};
use serde_json::json;

/// Chat-completion call against an OpenAI-style endpoint.
///
/// Config: `base_url`, `model`, optional `api_key`, `prompt` (template over
/// the input, defaults to the raw input text), `system`, `temperature`.
pub struct LlmHandler {
    client: reqwest::Client,
}

impl LlmHandler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for LlmHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for LlmHandler {
    fn kind(&self) -> &str {
        kinds::LLM
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let model = ctx.require_config_str("model")?.to_string();
        let prompt = match ctx.config.get("prompt").and_then(|p| p.as_str()) {
            Some(template) => render_template(template, &ctx.input),
            None => ctx
                .input_text()
                .ok_or_else(|| NodeError::MissingInput("prompt".to_string()))?,
        };

        let mut messages = Vec::new();
        if let Some(system) = ctx.config.get("system").and_then(|s| s.as_str()) {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        ctx.events.info(format!("calling model {}", model));
        let payload = chat_completion(&self.client, &ctx, &model, messages, None).await?;
        let content = message_content(&payload)?;

        Ok(HandlerOutcome::new(content).with_log(format!("model {} responded", model)))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Chat completion against a configured model".to_string(),
            category: "model".to_string(),
        }
    }
}

/// Like `llm`, with agent instructions as the system message and a tool
/// list forwarded verbatim. The tool loop itself lives with the caller.
pub struct AgentHandler {
    client: reqwest::Client,
}

impl AgentHandler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for AgentHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for AgentHandler {
    fn kind(&self) -> &str {
        kinds::AGENT
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let model = ctx.require_config_str("model")?.to_string();
        let task = match ctx.config.get("prompt").and_then(|p| p.as_str()) {
            Some(template) => render_template(template, &ctx.input),
            None => ctx
                .input_text()
                .ok_or_else(|| NodeError::MissingInput("prompt".to_string()))?,
        };

        let mut messages = Vec::new();
        if let Some(instructions) = ctx.config.get("instructions").and_then(|s| s.as_str()) {
            messages.push(json!({"role": "system", "content": instructions}));
        }
        messages.push(json!({"role": "user", "content": task}));

        let tools = ctx.config.get("tools").and_then(|t| t.as_json()).cloned();

        ctx.events.info(format!("agent call with model {}", model));
        let payload = chat_completion(&self.client, &ctx, &model, messages, tools).await?;

        let message = &payload["choices"][0]["message"];
        if message["tool_calls"].is_array() {
            return Ok(HandlerOutcome::new(Value::Json(message.clone()))
                .with_log("model requested tool calls".to_string()));
        }
        let content = message_content(&payload)?;
        Ok(HandlerOutcome::new(content))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Instructed model call with forwarded tools".to_string(),
            category: "model".to_string(),
        }
    }
}

async fn chat_completion(
    client: &reqwest::Client,
    ctx: &HandlerContext,
    model: &str,
    messages: Vec<serde_json::Value>,
    tools: Option<serde_json::Value>,
) -> Result<serde_json::Value, NodeError> {
    let base_url = ctx.require_config_str("base_url")?;
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let mut body = json!({"model": model, "messages": messages});
    if let Some(temperature) = ctx.config.get("temperature").and_then(|t| t.as_f64()) {
        body["temperature"] = json!(temperature);
    }
    if let Some(tools) = tools {
        body["tools"] = tools;
    }

    let mut request = client.post(&url).json(&body);
    if let Some(api_key) = ctx.config.get("api_key").and_then(|k| k.as_str()) {
        request = request.bearer_auth(api_key);
    }

    let response = tokio::select! {
        _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        response = request.send() => response
            .map_err(|e| NodeError::Upstream(format!("chat request failed: {}", e)))?,
    };

    let status = response.status();
    let payload: serde_json::Value = response
        .json()
        .await
        .map_err(|e| NodeError::Upstream(format!("invalid chat response: {}", e)))?;

    if !status.is_success() {
        return Err(NodeError::Upstream(format!(
            "chat endpoint returned {}: {}",
            status, payload
        )));
    }
    Ok(payload)
}

fn message_content(payload: &serde_json::Value) -> Result<Value, NodeError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| Value::String(content.to_string()))
        .ok_or_else(|| NodeError::Upstream("chat response has no content".to_string()))
}

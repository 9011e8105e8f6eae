use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};

/// Declarative projection over the input.
///
/// Config `mappings` is an object of `out_key -> spec`: a spec of `"$"`
/// copies the whole input, `"$.a.b"` resolves a dot-path into it, anything
/// else is a literal. Without mappings the input passes through untouched.
pub struct CodeHandler;

#[async_trait]
impl NodeHandler for CodeHandler {
    fn kind(&self) -> &str {
        kinds::CODE
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let Some(mappings) = ctx.config.get("mappings") else {
            return Ok(HandlerOutcome::new(ctx.input));
        };
        let mappings = mappings.as_object().ok_or_else(|| {
            NodeError::Configuration("Config 'mappings' must be an object".to_string())
        })?;

        let mut out = Vec::with_capacity(mappings.len());
        for (key, spec) in mappings {
            let value = match spec.as_str() {
                Some("$") => ctx.input.clone(),
                Some(path) if path.starts_with("$.") => {
                    ctx.input.get_path(&path[2..]).unwrap_or(Value::Null)
                }
                _ => spec.clone(),
            };
            out.push((key, value));
        }

        Ok(HandlerOutcome::new(Value::object(out)))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Project input fields into a new shape".to_string(),
            category: "transform".to_string(),
        }
    }
}

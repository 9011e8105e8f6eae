use async_trait::async_trait;
use loomcore::{kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler};

/// Entry node: forwards the caller-provided initial input downstream
pub struct StartHandler;

#[async_trait]
impl NodeHandler for StartHandler {
    fn kind(&self) -> &str {
        kinds::START
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        Ok(HandlerOutcome::new(ctx.input))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Entry point, forwards the run input".to_string(),
            category: "control".to_string(),
        }
    }
}

/// Terminal node: whatever arrives here becomes (part of) the final output
pub struct EndHandler;

#[async_trait]
impl NodeHandler for EndHandler {
    fn kind(&self) -> &str {
        kinds::END
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        Ok(HandlerOutcome::new(ctx.input))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Terminal point, yields the final output".to_string(),
            category: "control".to_string(),
        }
    }
}

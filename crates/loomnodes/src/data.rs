use crate::template::render_template;
use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};

// The data-analysis kinds build structured artifacts from config + input.
// Executing those artifacts (running SQL, rendering charts) belongs to the
// surrounding product, not the engine.

/// Build a filter descriptor for a named business object.
/// Config: `object`, optional `fields` (array of column names).
pub struct ObjectQueryHandler;

#[async_trait]
impl NodeHandler for ObjectQueryHandler {
    fn kind(&self) -> &str {
        kinds::OBJECT_QUERY
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let object = ctx.require_config_str("object")?.to_string();
        let fields = ctx.get_config_or("fields", Value::Array(Vec::new()));

        Ok(HandlerOutcome::new(Value::object([
            ("object".to_string(), Value::String(object)),
            ("fields".to_string(), fields),
            ("criteria".to_string(), ctx.input),
        ])))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Build a filter over a business object".to_string(),
            category: "data".to_string(),
        }
    }
}

/// Select a table and column set for downstream queries.
/// Config: `table`, optional `columns` (defaults to all), `limit`.
pub struct TableSelectHandler;

#[async_trait]
impl NodeHandler for TableSelectHandler {
    fn kind(&self) -> &str {
        kinds::TABLE_SELECT
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let table = ctx.require_config_str("table")?.to_string();
        let columns = ctx.get_config_or("columns", Value::Array(vec![Value::String("*".into())]));
        let limit = ctx.get_config_or("limit", Value::Null);

        Ok(HandlerOutcome::new(Value::object([
            ("table".to_string(), Value::String(table)),
            ("columns".to_string(), columns),
            ("limit".to_string(), limit),
        ])))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Pick the table and columns to query".to_string(),
            category: "data".to_string(),
        }
    }
}

/// Check the input for required fields and phrase a clarifying question
/// for the ones that are missing.
/// Config: `required` (array of field paths), optional `question` template.
pub struct DataClarifyHandler;

#[async_trait]
impl NodeHandler for DataClarifyHandler {
    fn kind(&self) -> &str {
        kinds::DATA_CLARIFY
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let required = ctx
            .get_config_or("required", Value::Array(Vec::new()))
            .as_array()
            .unwrap_or_default();

        let missing: Vec<Value> = required
            .iter()
            .filter_map(|field| field.as_str().map(String::from))
            .filter(|field| {
                ctx.input
                    .get_path(field)
                    .map(|v| v.is_null())
                    .unwrap_or(true)
            })
            .map(Value::String)
            .collect();

        let complete = missing.is_empty();
        let question = if complete {
            Value::Null
        } else {
            let template = ctx
                .config
                .get("question")
                .and_then(|q| q.as_str())
                .unwrap_or("Please provide: {{input}}")
                .to_string();
            Value::String(render_template(&template, &Value::Array(missing.clone())))
        };

        Ok(HandlerOutcome::new(Value::object([
            ("complete".to_string(), Value::Bool(complete)),
            ("missing".to_string(), Value::Array(missing)),
            ("question".to_string(), question),
            ("input".to_string(), ctx.input),
        ])))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Detect missing fields and ask for clarification".to_string(),
            category: "data".to_string(),
        }
    }
}

/// Render a parameterized SQL statement from the input.
/// Config: `sql` template with `{{param}}` placeholders.
pub struct DataQueryHandler;

#[async_trait]
impl NodeHandler for DataQueryHandler {
    fn kind(&self) -> &str {
        kinds::DATA_QUERY
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let template = ctx.require_config_str("sql")?;
        let sql = render_template(template, &ctx.input);

        Ok(HandlerOutcome::new(Value::object([
            ("sql".to_string(), Value::String(sql)),
            ("params".to_string(), ctx.input),
        ]))
        .with_log("rendered query statement".to_string()))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Render a parameterized query statement".to_string(),
            category: "data".to_string(),
        }
    }
}

/// Assemble a chart specification over tabular input.
/// Config: `chart_type` (default "bar"), `x_field`, `y_field`.
pub struct DataVisualizeHandler;

#[async_trait]
impl NodeHandler for DataVisualizeHandler {
    fn kind(&self) -> &str {
        kinds::DATA_VISUALIZE
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let chart_type = ctx.get_config_or("chart_type", Value::String("bar".to_string()));
        let x_field = ctx.get_config_or("x_field", Value::Null);
        let y_field = ctx.get_config_or("y_field", Value::Null);

        let rows = ctx
            .input
            .as_array()
            .map(Value::Array)
            .or_else(|| ctx.input.get("rows"))
            .unwrap_or(Value::Array(Vec::new()));

        Ok(HandlerOutcome::new(Value::object([
            (
                "chart".to_string(),
                Value::object([
                    ("type".to_string(), chart_type),
                    ("x".to_string(), x_field),
                    ("y".to_string(), y_field),
                ]),
            ),
            ("data".to_string(), rows),
        ])))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Assemble a chart spec over tabular input".to_string(),
            category: "data".to_string(),
        }
    }
}

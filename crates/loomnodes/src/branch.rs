use async_trait::async_trait;
use loomcore::{
    kinds, HandlerContext, HandlerMetadata, HandlerOutcome, NodeError, NodeHandler, Value,
};

/// Conditional router: evaluates configured routes against the input and
/// selects the matching source handle(s).
///
/// Config:
/// - `routes`: array of `{handle, field, op, value}`; ops are eq, ne, gt,
///   lt, contains, exists
/// - `default`: handle selected when no route matches
/// - `mode`: "first" (default) stops at the first match, "multi" selects
///   every matching route
pub struct BranchHandler;

#[async_trait]
impl NodeHandler for BranchHandler {
    fn kind(&self) -> &str {
        kinds::BRANCH
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let routes = ctx.require_config("routes")?.as_array().ok_or_else(|| {
            NodeError::Configuration("Config 'routes' must be an array".to_string())
        })?;
        let multi = ctx
            .get_config_or("mode", Value::String("first".to_string()))
            .as_str()
            .map(|m| m == "multi")
            .unwrap_or(false);

        let mut selected = Vec::new();
        for route in &routes {
            let Some(handle) = route.get("handle").and_then(|h| h.as_str().map(String::from))
            else {
                return Err(NodeError::Configuration(
                    "Route is missing a 'handle'".to_string(),
                ));
            };
            if route_matches(route, &ctx.input) {
                selected.push(handle);
                if !multi {
                    break;
                }
            }
        }

        if selected.is_empty() {
            if let Some(default) = ctx.config.get("default").and_then(|d| d.as_str()) {
                selected.push(default.to_string());
            }
        }

        let log = format!("selected handles: [{}]", selected.join(", "));
        Ok(HandlerOutcome::new(ctx.input)
            .with_branch(selected)
            .with_log(log))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Route by configured conditions over the input".to_string(),
            category: "routing".to_string(),
        }
    }
}

fn route_matches(route: &Value, input: &Value) -> bool {
    let Some(field) = route.get("field").and_then(|f| f.as_str().map(String::from)) else {
        return false;
    };
    let op = route
        .get("op")
        .and_then(|o| o.as_str().map(String::from))
        .unwrap_or_else(|| "eq".to_string());
    let actual = input.get_path(&field);
    let expected = route.get("value");

    match op.as_str() {
        "exists" => actual.is_some(),
        "eq" => compare(actual.as_ref(), expected.as_ref()) == Some(std::cmp::Ordering::Equal),
        "ne" => compare(actual.as_ref(), expected.as_ref()) != Some(std::cmp::Ordering::Equal),
        "gt" => compare(actual.as_ref(), expected.as_ref()) == Some(std::cmp::Ordering::Greater),
        "lt" => compare(actual.as_ref(), expected.as_ref()) == Some(std::cmp::Ordering::Less),
        "contains" => match (actual, expected) {
            (Some(a), Some(e)) => match (a.as_str(), e.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}

fn compare(actual: Option<&Value>, expected: Option<&Value>) -> Option<std::cmp::Ordering> {
    let (actual, expected) = (actual?, expected?);
    if let (Some(a), Some(e)) = (actual.as_f64(), expected.as_f64()) {
        return a.partial_cmp(&e);
    }
    if let (Some(a), Some(e)) = (actual.as_str(), expected.as_str()) {
        return Some(a.cmp(e));
    }
    if let (Some(a), Some(e)) = (actual.as_bool(), expected.as_bool()) {
        return Some(a.cmp(&e));
    }
    None
}

/// Intent classifier: scores configured keyword tables against the input
/// text and selects the best-scoring intent's handle.
///
/// Config:
/// - `intents`: array of `{handle, keywords: [..]}`
/// - `fallback`: handle selected when nothing scores
pub struct IntentHandler;

#[async_trait]
impl NodeHandler for IntentHandler {
    fn kind(&self) -> &str {
        kinds::INTENT_RECOGNIZE
    }

    async fn run(&self, ctx: HandlerContext) -> Result<HandlerOutcome, NodeError> {
        let intents = ctx.require_config("intents")?.as_array().ok_or_else(|| {
            NodeError::Configuration("Config 'intents' must be an array".to_string())
        })?;
        let text = ctx
            .input_text()
            .ok_or_else(|| NodeError::MissingInput("query".to_string()))?;
        let lowered = text.to_lowercase();

        let mut best: Option<(String, usize)> = None;
        for intent in &intents {
            let Some(handle) = intent.get("handle").and_then(|h| h.as_str().map(String::from))
            else {
                continue;
            };
            let score = intent
                .get("keywords")
                .and_then(|k| k.as_array())
                .unwrap_or_default()
                .iter()
                .filter_map(|k| k.as_str().map(str::to_lowercase))
                .filter(|keyword| lowered.contains(keyword))
                .count();
            if score > 0 && best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((handle, score));
            }
        }

        let selected = best
            .map(|(handle, _)| handle)
            .or_else(|| {
                ctx.config
                    .get("fallback")
                    .and_then(|f| f.as_str().map(String::from))
            });

        ctx.events.info(match &selected {
            Some(handle) => format!("recognized intent '{}'", handle),
            None => "no intent recognized".to_string(),
        });

        let output = Value::object([
            (
                "intent".to_string(),
                selected
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
            ("query".to_string(), Value::String(text)),
        ]);

        Ok(HandlerOutcome::new(output).with_branch(selected.into_iter().collect()))
    }

    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            description: "Route by keyword-scored intent recognition".to_string(),
            category: "routing".to_string(),
        }
    }
}

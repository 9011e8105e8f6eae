use loomcore::{EventBus, HandlerContext, NodeError, NodeHandler, Value};
use loomnodes::{
    BranchHandler, CodeHandler, DataClarifyHandler, DataQueryHandler, DataVisualizeHandler,
    EndHandler, IntentHandler, ObjectQueryHandler, StartHandler, TableSelectHandler,
};
use std::collections::HashMap;

// Helper to create a handler context without a running scheduler
fn test_context(config: HashMap<String, Value>, input: Value) -> HandlerContext {
    let bus = EventBus::new(100);
    HandlerContext {
        node_id: "node-under-test".to_string(),
        config,
        input,
        events: bus.create_emitter(uuid::Uuid::new_v4(), "node-under-test"),
        cancellation: tokio_util::sync::CancellationToken::new(),
    }
}

fn config(entries: &[(&str, serde_json::Value)]) -> HashMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Json(v.clone())))
        .collect()
}

fn input(json: serde_json::Value) -> Value {
    Value::from_json(json)
}

#[tokio::test]
async fn start_and_end_pass_their_input_through() {
    let payload = input(serde_json::json!({"query": "hello"}));

    let out = StartHandler
        .run(test_context(HashMap::new(), payload.clone()))
        .await
        .expect("start should not fail");
    assert_eq!(out.output, payload);
    assert!(out.branch.is_none());

    let out = EndHandler
        .run(test_context(HashMap::new(), payload.clone()))
        .await
        .expect("end should not fail");
    assert_eq!(out.output, payload);
}

#[tokio::test]
async fn branch_selects_the_first_matching_route() {
    let cfg = config(&[(
        "routes",
        serde_json::json!([
            {"handle": "hot", "field": "temp", "op": "gt", "value": 30},
            {"handle": "known", "field": "temp", "op": "exists"},
        ]),
    )]);

    let out = BranchHandler
        .run(test_context(cfg, input(serde_json::json!({"temp": 35}))))
        .await
        .expect("branch should not fail");
    assert_eq!(out.branch, Some(vec!["hot".to_string()]));
}

#[tokio::test]
async fn branch_multi_mode_selects_every_matching_route() {
    let cfg = config(&[
        (
            "routes",
            serde_json::json!([
                {"handle": "hot", "field": "temp", "op": "gt", "value": 30},
                {"handle": "known", "field": "temp", "op": "exists"},
                {"handle": "cold", "field": "temp", "op": "lt", "value": 0},
            ]),
        ),
        ("mode", serde_json::json!("multi")),
    ]);

    let out = BranchHandler
        .run(test_context(cfg, input(serde_json::json!({"temp": 35}))))
        .await
        .expect("branch should not fail");
    assert_eq!(
        out.branch,
        Some(vec!["hot".to_string(), "known".to_string()])
    );
}

#[tokio::test]
async fn branch_falls_back_to_the_default_handle() {
    let cfg = config(&[
        (
            "routes",
            serde_json::json!([
                {"handle": "hot", "field": "temp", "op": "gt", "value": 30},
            ]),
        ),
        ("default", serde_json::json!("other")),
    ]);

    let out = BranchHandler
        .run(test_context(cfg, input(serde_json::json!({"temp": 5}))))
        .await
        .expect("branch should not fail");
    assert_eq!(out.branch, Some(vec!["other".to_string()]));
}

#[tokio::test]
async fn branch_with_no_match_and_no_default_selects_nothing() {
    let cfg = config(&[(
        "routes",
        serde_json::json!([
            {"handle": "hot", "field": "temp", "op": "gt", "value": 30},
        ]),
    )]);

    let out = BranchHandler
        .run(test_context(cfg, input(serde_json::json!({"temp": 5}))))
        .await
        .expect("branch should not fail");
    assert_eq!(out.branch, Some(Vec::new()));
}

#[tokio::test]
async fn branch_string_comparison_supports_eq_and_contains() {
    let cfg = config(&[(
        "routes",
        serde_json::json!([
            {"handle": "chart", "field": "query", "op": "contains", "value": "chart"},
            {"handle": "exact", "field": "kind", "op": "eq", "value": "report"},
        ]),
    )]);

    let out = BranchHandler
        .run(test_context(
            cfg.clone(),
            input(serde_json::json!({"query": "chart my sales", "kind": "other"})),
        ))
        .await
        .expect("branch should not fail");
    assert_eq!(out.branch, Some(vec!["chart".to_string()]));

    let out = BranchHandler
        .run(test_context(
            cfg,
            input(serde_json::json!({"query": "sales", "kind": "report"})),
        ))
        .await
        .expect("branch should not fail");
    assert_eq!(out.branch, Some(vec!["exact".to_string()]));
}

#[tokio::test]
async fn intent_picks_the_best_scoring_keyword_table() {
    let cfg = config(&[(
        "intents",
        serde_json::json!([
            {"handle": "viz", "keywords": ["chart", "plot", "graph"]},
            {"handle": "query", "keywords": ["how many", "count"]},
        ]),
    )]);

    let out = IntentHandler
        .run(test_context(
            cfg,
            input(serde_json::json!({"query": "Plot a chart of monthly revenue"})),
        ))
        .await
        .expect("intent should not fail");
    assert_eq!(out.branch, Some(vec!["viz".to_string()]));
    assert_eq!(
        out.output.get("intent"),
        Some(Value::String("viz".to_string()))
    );
}

#[tokio::test]
async fn intent_uses_the_fallback_when_nothing_scores() {
    let cfg = config(&[
        (
            "intents",
            serde_json::json!([{"handle": "viz", "keywords": ["chart"]}]),
        ),
        ("fallback", serde_json::json!("chat")),
    ]);

    let out = IntentHandler
        .run(test_context(cfg, Value::String("what is the weather".into())))
        .await
        .expect("intent should not fail");
    assert_eq!(out.branch, Some(vec!["chat".to_string()]));
}

#[tokio::test]
async fn intent_without_text_input_is_an_error() {
    let cfg = config(&[("intents", serde_json::json!([]))]);

    let result = IntentHandler
        .run(test_context(cfg, Value::Number(7.0)))
        .await;
    assert!(matches!(result, Err(NodeError::MissingInput(_))));
}

#[tokio::test]
async fn code_projects_paths_and_literals() {
    let cfg = config(&[(
        "mappings",
        serde_json::json!({
            "question": "$.query",
            "everything": "$",
            "source": "catalog",
        }),
    )]);

    let out = CodeHandler
        .run(test_context(
            cfg,
            input(serde_json::json!({"query": "hi", "extra": 1})),
        ))
        .await
        .expect("code should not fail");

    assert_eq!(
        out.output.get("question"),
        Some(Value::String("hi".to_string()))
    );
    assert!(out.output.get("everything").map(|v| v.get("extra").is_some()).unwrap_or(false));
    assert_eq!(
        out.output.get("source").and_then(|v| v.as_str().map(String::from)),
        Some("catalog".to_string())
    );
}

#[tokio::test]
async fn code_without_mappings_passes_through() {
    let payload = input(serde_json::json!({"a": 1}));
    let out = CodeHandler
        .run(test_context(HashMap::new(), payload.clone()))
        .await
        .expect("code should not fail");
    assert_eq!(out.output, payload);
}

#[tokio::test]
async fn data_clarify_reports_missing_required_fields() {
    let cfg = config(&[("required", serde_json::json!(["city", "date"]))]);

    let out = DataClarifyHandler
        .run(test_context(cfg, input(serde_json::json!({"city": "berlin"}))))
        .await
        .expect("clarify should not fail");

    assert_eq!(out.output.get("complete"), Some(Value::Bool(false)));
    let missing = out
        .output
        .get("missing")
        .and_then(|m| m.as_array())
        .expect("missing list");
    assert_eq!(missing, vec![Value::String("date".to_string())]);
    assert!(out.output.get("question").map(|q| !q.is_null()).unwrap_or(false));
}

#[tokio::test]
async fn data_clarify_is_complete_when_everything_is_present() {
    let cfg = config(&[("required", serde_json::json!(["city"]))]);

    let out = DataClarifyHandler
        .run(test_context(cfg, input(serde_json::json!({"city": "berlin"}))))
        .await
        .expect("clarify should not fail");

    assert_eq!(out.output.get("complete"), Some(Value::Bool(true)));
    assert_eq!(out.output.get("question"), Some(Value::Null));
}

#[tokio::test]
async fn data_query_renders_parameters_into_the_statement() {
    let cfg = config(&[(
        "sql",
        serde_json::json!("select total from sales where city = '{{city}}' limit {{limit}}"),
    )]);

    let out = DataQueryHandler
        .run(test_context(
            cfg,
            input(serde_json::json!({"city": "berlin", "limit": 10})),
        ))
        .await
        .expect("query should not fail");

    assert_eq!(
        out.output.get("sql"),
        Some(Value::String(
            "select total from sales where city = 'berlin' limit 10".to_string()
        ))
    );
}

#[tokio::test]
async fn data_visualize_wraps_rows_in_a_chart_spec() {
    let cfg = config(&[
        ("chart_type", serde_json::json!("line")),
        ("x_field", serde_json::json!("month")),
        ("y_field", serde_json::json!("total")),
    ]);

    let out = DataVisualizeHandler
        .run(test_context(
            cfg,
            input(serde_json::json!({"rows": [{"month": "jan", "total": 12}]})),
        ))
        .await
        .expect("visualize should not fail");

    let chart = out.output.get("chart").expect("chart spec");
    assert_eq!(chart.get("type"), Some(Value::Json(serde_json::json!("line"))));
    let data = out.output.get("data").and_then(|d| d.as_array()).expect("rows");
    assert_eq!(data.len(), 1);
}

#[tokio::test]
async fn table_select_defaults_to_all_columns() {
    let cfg = config(&[("table", serde_json::json!("sales"))]);

    let out = TableSelectHandler
        .run(test_context(cfg, Value::Null))
        .await
        .expect("table select should not fail");

    assert_eq!(
        out.output.get("table"),
        Some(Value::String("sales".to_string()))
    );
    let columns = out
        .output
        .get("columns")
        .and_then(|c| c.as_array())
        .expect("columns");
    assert_eq!(columns, vec![Value::String("*".to_string())]);
}

#[tokio::test]
async fn object_query_carries_the_criteria_through() {
    let cfg = config(&[("object", serde_json::json!("customers"))]);
    let criteria = input(serde_json::json!({"region": "emea"}));

    let out = ObjectQueryHandler
        .run(test_context(cfg, criteria.clone()))
        .await
        .expect("object query should not fail");

    assert_eq!(
        out.output.get("object"),
        Some(Value::String("customers".to_string()))
    );
    assert_eq!(out.output.get("criteria"), Some(criteria));
}

use loomcore::{kinds, FlowGraph, NodeSpec, ValidationError, Value};

fn linear_graph() -> FlowGraph {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("llm", kinds::LLM));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "llm");
    graph.connect("llm", "end");
    graph
}

#[test]
fn valid_graph_passes_without_warnings() {
    let graph = linear_graph();
    let report = graph.validate().expect("graph should be valid");
    assert!(report.warnings.is_empty());
    assert_eq!(report.reachable.len(), 3);
}

#[test]
fn missing_start_is_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("llm", kinds::LLM));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("llm", "end");

    assert_eq!(graph.validate().unwrap_err(), ValidationError::MissingStart);
}

#[test]
fn multiple_starts_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("s1", kinds::START));
    graph.add_node(NodeSpec::new("s2", kinds::START));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("s1", "end");
    graph.connect("s2", "end");

    assert_eq!(
        graph.validate().unwrap_err(),
        ValidationError::MultipleStarts(2)
    );
}

#[test]
fn cycles_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("a", kinds::CODE));
    graph.add_node(NodeSpec::new("b", kinds::CODE));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "a");
    graph.connect("a", "b");
    graph.connect("b", "a");
    graph.connect("b", "end");

    assert_eq!(
        graph.validate().unwrap_err(),
        ValidationError::CyclicDependency
    );
}

#[test]
fn dangling_edge_endpoints_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "ghost");
    graph.connect("start", "end");

    match graph.validate().unwrap_err() {
        ValidationError::DanglingEdge { node, .. } => assert_eq!(node, "ghost"),
        other => panic!("expected a dangling edge error, got {:?}", other),
    }
}

#[test]
fn nodes_without_incoming_edges_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("floating", kinds::CODE));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "end");
    graph.connect("floating", "end");

    assert_eq!(
        graph.validate().unwrap_err(),
        ValidationError::OrphanNode("floating".to_string())
    );
}

#[test]
fn duplicate_branch_handles_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("branch", kinds::BRANCH));
    graph.add_node(NodeSpec::new("a", kinds::CODE));
    graph.add_node(NodeSpec::new("b", kinds::CODE));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "branch");
    graph.connect_handle("branch", "yes", "a");
    graph.edges.push(loomcore::Edge {
        id: "dup".to_string(),
        source: "branch".to_string(),
        source_handle: Some("yes".to_string()),
        target: "b".to_string(),
    });
    graph.connect("a", "end");
    graph.connect("b", "end");

    assert_eq!(
        graph.validate().unwrap_err(),
        ValidationError::DuplicateHandle {
            node: "branch".to_string(),
            handle: "yes".to_string(),
        }
    );
}

#[test]
fn duplicate_node_ids_are_rejected() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("start", kinds::START));

    assert_eq!(
        graph.validate().unwrap_err(),
        ValidationError::DuplicateNodeId("start".to_string())
    );
}

#[test]
fn dead_end_non_end_nodes_are_warned_about() {
    let mut graph = FlowGraph::new();
    graph.add_node(NodeSpec::new("start", kinds::START));
    graph.add_node(NodeSpec::new("sink", kinds::CODE));
    graph.add_node(NodeSpec::new("end", kinds::END));
    graph.connect("start", "sink");
    graph.connect("start", "end");

    let report = graph.validate().expect("a dead end is not fatal");
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("sink") && w.contains("no outgoing")));
}

#[test]
fn graph_round_trips_through_json() {
    let mut graph = linear_graph();
    graph.nodes[1].label = "Ask the model".to_string();
    graph.nodes[1]
        .config
        .insert("model".to_string(), Value::String("gpt-4o-mini".to_string()));

    let json = serde_json::to_string(&graph).expect("graph serializes");
    let parsed: FlowGraph = serde_json::from_str(&json).expect("graph deserializes");

    assert_eq!(parsed.nodes.len(), 3);
    assert_eq!(parsed.edges.len(), 2);
    assert_eq!(parsed.nodes[1].label, "Ask the model");
    assert_eq!(
        parsed.nodes[1].config.get("model"),
        Some(&Value::String("gpt-4o-mini".to_string()))
    );
    assert!(parsed.edges.iter().all(|e| e.source_handle.is_none()));
}

#[test]
fn value_paths_traverse_nested_objects() {
    let value = Value::from_json(serde_json::json!({
        "user": {"address": {"city": "berlin"}},
        "count": 3,
    }));

    assert_eq!(
        value.get_path("user.address.city"),
        Some(Value::String("berlin".to_string()))
    );
    assert_eq!(value.get_path("count").and_then(|v| v.as_f64()), Some(3.0));
    assert_eq!(value.get_path("user.missing"), None);
}

#[test]
fn json_values_expose_arrays_and_objects() {
    let value = Value::Json(serde_json::json!({"items": [1, 2, 3]}));
    let items = value.get("items").and_then(|v| v.as_array()).expect("array view");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_f64(), Some(1.0));

    let object = value.as_object().expect("object view");
    assert!(object.contains_key("items"));
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use loomcore::{kinds, ExecutionEvent, FlowGraph, NodeSpec, NodeStatus, Value};
use loomruntime::FlowRuntime;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loomflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow graph file
    Run {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Initial input as JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a flow graph file
    Validate {
        /// Path to graph JSON file
        file: PathBuf,
    },

    /// List available node kinds
    Nodes,

    /// Create a new example graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "flow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            // Initialize logging
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::WARN)
                    .init();
            }

            run_flow(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_flow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_flow(output)?;
        }
    }

    Ok(())
}

async fn run_flow(file: PathBuf, input: Option<String>) -> Result<()> {
    println!("🚀 Loading flow from: {}", file.display());

    // Load graph
    let graph_json = std::fs::read_to_string(&file)?;
    let graph: FlowGraph = serde_json::from_str(&graph_json)?;

    println!("📋 Flow: {} nodes, {} edges", graph.nodes.len(), graph.edges.len());
    println!();

    // Parse initial input
    let initial_input = match input {
        Some(input_str) => {
            let json: serde_json::Value = serde_json::from_str(&input_str)?;
            Value::from_json(json)
        }
        None => Value::Null,
    };

    // Create runtime with the built-in handlers
    let mut registry = loomruntime::HandlerRegistry::new();
    loomnodes::register_all(&mut registry);

    let runtime = FlowRuntime::with_registry(
        std::sync::Arc::new(registry),
        loomruntime::RuntimeConfig::default(),
    );

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();

    // Spawn event listener
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { run_id, .. } => {
                    println!("▶️  Run started: {}", run_id);
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_kind, ..
                } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_kind);
                }
                ExecutionEvent::NodeFinalized { runtime, .. } => match runtime.status {
                    NodeStatus::Success => {
                        println!(
                            "  ✅ Node {} completed in {}ms",
                            runtime.node_id, runtime.duration_ms
                        );
                    }
                    NodeStatus::Failed => {
                        let reason = runtime.logs.last().cloned().unwrap_or_default();
                        println!("  ❌ Node {} failed: {}", runtime.node_id, reason);
                    }
                    NodeStatus::Skipped => {
                        println!("  ⏭️  Node {} skipped", runtime.node_id);
                    }
                    _ => {}
                },
                ExecutionEvent::NodeLog {
                    node_id, message, ..
                } => {
                    println!("     ℹ️  [{}] {}", node_id, message);
                }
                ExecutionEvent::RunCompleted {
                    status,
                    duration_ms,
                    ..
                } => match status {
                    loomcore::RunStatus::Success => {
                        println!("✨ Run completed successfully in {}ms", duration_ms);
                    }
                    loomcore::RunStatus::Failed => {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                },
            }
        }
    });

    // Execute the graph
    let result = runtime.execute(&graph, initial_input).await?;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Run Summary:");
    println!("   Run ID: {}", result.run_id);
    println!("   Status: {:?}", result.status);
    println!("   Resolution order: {}", result.node_order.join(" → "));

    if !result.warnings.is_empty() {
        println!();
        println!("⚠️  Warnings:");
        for warning in &result.warnings {
            println!("   - {}", warning);
        }
    }

    if !result.final_output.is_null() {
        println!();
        println!("📤 Final output:");
        println!("{}", serde_json::to_string_pretty(&result.final_output.to_json())?);
    }

    Ok(())
}

fn validate_flow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating flow: {}", file.display());

    let graph_json = std::fs::read_to_string(&file)?;
    let graph: FlowGraph = serde_json::from_str(&graph_json)?;

    match graph.validate() {
        Ok(report) => {
            println!("✅ Flow is valid:");
            println!("   Nodes: {}", graph.nodes.len());
            println!("   Edges: {}", graph.edges.len());
            for warning in &report.warnings {
                println!("   ⚠️  {}", warning);
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Flow is invalid: {}", e);
            Err(e.into())
        }
    }
}

fn list_nodes() {
    println!("📦 Available Node Kinds:");
    println!();

    let mut registry = loomruntime::HandlerRegistry::new();
    loomnodes::register_all(&mut registry);

    for kind in registry.list_kinds() {
        if let Some(metadata) = registry.metadata(&kind) {
            println!("  • {} ({})", kind, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", kind);
        }
    }
}

fn create_example_flow(output: PathBuf) -> Result<()> {
    let mut graph = FlowGraph::new();

    let start = graph.add_node(NodeSpec::new("start", kinds::START).with_label("Start"));
    let router = graph.add_node(
        NodeSpec::new("router", kinds::BRANCH)
            .with_label("Route by topic")
            .with_config(
                "routes",
                serde_json::json!([
                    {"handle": "chart", "field": "query", "op": "contains", "value": "chart"},
                ]),
            )
            .with_config("default", "answer"),
    );
    let mapper = graph.add_node(
        NodeSpec::new("shape", kinds::CODE)
            .with_label("Shape rows")
            .with_config("mappings", serde_json::json!({"rows": "$.rows"})),
    );
    let chart = graph.add_node(
        NodeSpec::new("chart", kinds::DATA_VISUALIZE)
            .with_label("Chart it")
            .with_config("chart_type", "line")
            .with_config("x_field", "month")
            .with_config("y_field", "total"),
    );
    let answer = graph.add_node(
        NodeSpec::new("answer", kinds::CODE)
            .with_label("Echo the question")
            .with_config("mappings", serde_json::json!({"answer": "$.query"})),
    );
    let end = graph.add_node(NodeSpec::new("end", kinds::END).with_label("End"));

    graph.connect(start, router.clone());
    graph.connect_handle(router.clone(), "chart", mapper.clone());
    graph.connect_handle(router, "answer", answer.clone());
    graph.connect(mapper, chart.clone());
    graph.connect(chart, end.clone());
    graph.connect(answer, end);

    // Save to file
    let json = serde_json::to_string_pretty(&graph)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example flow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  loom run --file {} --input '{{\"query\": \"chart monthly totals\", \"rows\": []}}'",
        output.display()
    );

    Ok(())
}

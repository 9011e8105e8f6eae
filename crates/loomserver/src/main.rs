use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use loomcore::{FlowError, FlowGraph, Value};
use loomruntime::FlowRuntime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<FlowRuntime>,
    flows: Arc<RwLock<HashMap<Uuid, StoredFlow>>>,
}

/// A registered flow definition. Storage is in-memory only; durable
/// persistence belongs to the surrounding product.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFlow {
    id: Uuid,
    name: String,
    graph: FlowGraph,
}

/// Request body for registering a flow
#[derive(Debug, Deserialize)]
struct CreateFlowRequest {
    name: String,
    graph: FlowGraph,
}

/// Request body for flow execution
#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    input: serde_json::Value,
}

/// Request body for executing an unregistered graph directly
#[derive(Debug, Deserialize)]
struct ExecuteGraphRequest {
    graph: FlowGraph,
    #[serde(default)]
    input: serde_json::Value,
}

/// Response for flow creation
#[derive(Debug, Serialize)]
struct FlowResponse {
    id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "loomflow"
    }))
}

/// List all registered flows
#[get("/api/flows")]
async fn list_flows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let flows = data.flows.read().await;
    let flow_list: Vec<_> = flows
        .values()
        .map(|f| {
            serde_json::json!({
                "id": f.id,
                "name": f.name,
                "nodes": f.graph.nodes.len(),
                "edges": f.graph.edges.len(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(flow_list))
}

/// Register a new flow; the graph is validated up front
#[post("/api/flows")]
async fn create_flow(
    data: web::Data<AppState>,
    req: web::Json<CreateFlowRequest>,
) -> ActixResult<impl Responder> {
    let CreateFlowRequest { name, graph } = req.into_inner();

    if let Err(e) = graph.validate() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }));
    }

    let flow = StoredFlow {
        id: Uuid::new_v4(),
        name,
        graph,
    };
    let flow_id = flow.id;

    info!("Registering flow: {} ({})", flow.name, flow_id);
    data.flows.write().await.insert(flow_id, flow);

    Ok(HttpResponse::Created().json(FlowResponse {
        id: flow_id,
        message: "Flow registered successfully".to_string(),
    }))
}

/// Get a specific flow
#[get("/api/flows/{id}")]
async fn get_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let flows = data.flows.read().await;

    match flows.get(&flow_id) {
        Some(flow) => Ok(HttpResponse::Ok().json(flow)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Flow {} not found", flow_id),
        })),
    }
}

/// Delete a flow
#[actix_web::delete("/api/flows/{id}")]
async fn delete_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let mut flows = data.flows.write().await;

    match flows.remove(&flow_id) {
        Some(_) => {
            info!("Deleted flow: {}", flow_id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Flow deleted successfully"
            })))
        }
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Flow {} not found", flow_id),
        })),
    }
}

/// Execute a registered flow
#[post("/api/flows/{id}/execute")]
async fn execute_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ExecuteRequest>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let input = Value::from_json(req.into_inner().input);

    let graph = {
        let flows = data.flows.read().await;
        match flows.get(&flow_id) {
            Some(flow) => flow.graph.clone(),
            None => {
                return Ok(HttpResponse::NotFound().json(ErrorResponse {
                    error: format!("Flow {} not found", flow_id),
                }))
            }
        }
    };

    info!("Executing flow: {}", flow_id);
    Ok(run_graph(&data.runtime, &graph, input).await)
}

/// Execute a graph without registering it first
#[post("/api/execute")]
async fn execute_graph(
    data: web::Data<AppState>,
    req: web::Json<ExecuteGraphRequest>,
) -> ActixResult<impl Responder> {
    let ExecuteGraphRequest { graph, input } = req.into_inner();
    Ok(run_graph(&data.runtime, &graph, Value::from_json(input)).await)
}

async fn run_graph(runtime: &FlowRuntime, graph: &FlowGraph, input: Value) -> HttpResponse {
    match runtime.execute(graph, input).await {
        Ok(result) => {
            info!(
                "run {} finished: {:?}, {} nodes resolved",
                result.run_id,
                result.status,
                result.node_order.len()
            );
            HttpResponse::Ok().json(result)
        }
        Err(FlowError::Validation(e)) => HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }),
        Err(e) => {
            error!("flow execution failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

/// WebSocket endpoint streaming incremental run events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    // Subscribe to events
    let mut events = data.runtime.subscribe_events();

    // Spawn task to handle WebSocket
    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                // Receive event from runtime
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            // Serialize and send event
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

                // Handle incoming WebSocket messages (ping/pong)
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List registered node kinds
#[get("/api/nodes")]
async fn list_node_kinds(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.runtime.registry();

    let nodes: Vec<_> = registry
        .list_kinds()
        .iter()
        .map(|kind| {
            let metadata = registry.metadata(kind);
            serde_json::json!({
                "kind": kind,
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🚀 Starting Loomflow Server");

    // Create runtime with the built-in handlers
    let mut registry = loomruntime::HandlerRegistry::new();
    loomnodes::register_all(&mut registry);

    let runtime = FlowRuntime::with_registry(
        Arc::new(registry),
        loomruntime::RuntimeConfig::default(),
    );

    info!("✅ Runtime initialized with built-in handlers");

    // Create app state
    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
        flows: Arc::new(RwLock::new(HashMap::new())),
    });

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_flows)
            .service(create_flow)
            .service(get_flow)
            .service(delete_flow)
            .service(execute_flow)
            .service(execute_graph)
            .service(websocket_events)
            .service(list_node_kinds)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

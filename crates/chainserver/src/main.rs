use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use chaincore::{ChainError, ExecutionMode, JobError, JobId, JobState, Value};
use chainruntime::{DeploymentRequest, ProcessingRuntime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<ProcessingRuntime>,
}

/// Request body for process execution
#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    inputs: HashMap<String, serde_json::Value>,
    #[serde(default)]
    mode: Option<ExecutionMode>,
}

/// Response for process deployment
#[derive(Debug, Serialize)]
struct DeployResponse {
    id: String,
}

/// Response for job creation and status polling
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_id: JobId,
    status: Option<JobState>,
}

/// Response carrying a job result document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultResponse {
    job_id: JobId,
    status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map engine errors to responses: unknown identifiers and bad requests
/// are client errors, only store trouble is a server error.
fn error_response(err: ChainError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        ChainError::UnknownProcess(_) | ChainError::UnknownJob(_) => {
            HttpResponse::NotFound().json(body)
        }
        ChainError::Store(_) => HttpResponse::InternalServerError().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "chainserver"
    }))
}

/// List all processes, including entries that are currently not callable
#[get("/api/processes")]
async fn list_processes(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    match data.runtime.inventory().await {
        Ok(inventory) => Ok(HttpResponse::Ok().json(inventory)),
        Err(e) => Ok(error_response(e)),
    }
}

/// Deploy a new container process
#[post("/api/processes")]
async fn deploy_process(
    data: web::Data<AppState>,
    request: web::Json<DeploymentRequest>,
) -> ActixResult<impl Responder> {
    let request = request.into_inner();
    info!("Deploying process for image: {}", request.image);

    match data.runtime.deploy(request).await {
        Ok(id) => Ok(HttpResponse::Created().json(DeployResponse { id })),
        Err(e) => {
            error!("Deployment failed: {}", e);
            Ok(error_response(e))
        }
    }
}

/// Remove every chain-backed process
#[actix_web::delete("/api/processes")]
async fn clear_processes(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    match data.runtime.clear_all().await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "All chain-backed processes removed"
        }))),
        Err(e) => Ok(error_response(e)),
    }
}

/// Get the full descriptor of one process, cardinalities included
#[get("/api/processes/{id}")]
async fn describe_process(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let process_id = path.into_inner();
    match data.runtime.describe(&process_id).await {
        Ok(descriptor) => Ok(HttpResponse::Ok().json(descriptor)),
        Err(e) => Ok(error_response(e)),
    }
}

/// Execute a process. Synchronous mode answers with the result document,
/// asynchronous mode answers with the job id for later polling.
#[post("/api/processes/{id}/execute")]
async fn execute_process(
    data: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<ExecuteRequest>,
) -> ActixResult<impl Responder> {
    let process_id = path.into_inner();
    let request = request.into_inner();
    let mode = request.mode.unwrap_or(ExecutionMode::Sync);

    info!("Executing process {} ({:?})", process_id, mode);

    let inputs: HashMap<String, Value> = request
        .inputs
        .into_iter()
        .map(|(k, v)| (k, Value::Json(v)))
        .collect();

    let handle = match data.runtime.execute(&process_id, inputs, mode).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Execution of {} rejected: {}", process_id, e);
            return Ok(error_response(e));
        }
    };

    match mode {
        ExecutionMode::Async => Ok(HttpResponse::Created().json(JobResponse {
            job_id: handle.job_id(),
            status: handle.request_status(),
        })),
        ExecutionMode::Sync => {
            let response = match handle.result().await {
                Ok(result) => ResultResponse {
                    job_id: handle.job_id(),
                    status: handle.state(),
                    result,
                    error: None,
                },
                Err(e) => ResultResponse {
                    job_id: handle.job_id(),
                    status: handle.state(),
                    result: None,
                    error: Some(e.to_string()),
                },
            };
            Ok(HttpResponse::Ok().json(response))
        }
    }
}

/// Poll job status. Synchronous jobs have no status document.
#[get("/api/jobs/{id}")]
async fn job_status(
    data: web::Data<AppState>,
    path: web::Path<JobId>,
) -> ActixResult<impl Responder> {
    let job_id = path.into_inner();
    match data.runtime.status(job_id).await {
        Ok(status) => Ok(HttpResponse::Ok().json(JobResponse { job_id, status })),
        Err(e) => Ok(error_response(e)),
    }
}

/// Non-blocking result fetch. While the job runs this reports the current
/// state; execution failures are part of the result document, not a
/// server error.
#[get("/api/jobs/{id}/result")]
async fn job_result(
    data: web::Data<AppState>,
    path: web::Path<JobId>,
) -> ActixResult<impl Responder> {
    let job_id = path.into_inner();
    let handle = match data.runtime.job(job_id).await {
        Some(handle) => handle,
        None => {
            return Ok(error_response(ChainError::UnknownJob(job_id.to_string())));
        }
    };

    match handle.try_result() {
        None => Ok(HttpResponse::Accepted().json(JobResponse {
            job_id,
            status: Some(handle.state()),
        })),
        Some(Ok(result)) => Ok(HttpResponse::Ok().json(ResultResponse {
            job_id,
            status: handle.state(),
            result,
            error: None,
        })),
        Some(Err(JobError::Dismissed)) => Ok(HttpResponse::Ok().json(ResultResponse {
            job_id,
            status: JobState::Dismissed,
            result: None,
            error: Some("job was dismissed".to_string()),
        })),
        Some(Err(e)) => Ok(HttpResponse::Ok().json(ResultResponse {
            job_id,
            status: handle.state(),
            result: None,
            error: Some(e.to_string()),
        })),
    }
}

/// Dismiss a job; on a terminal job this just reports the existing state
#[actix_web::delete("/api/jobs/{id}")]
async fn dismiss_job(
    data: web::Data<AppState>,
    path: web::Path<JobId>,
) -> ActixResult<impl Responder> {
    let job_id = path.into_inner();
    info!("Dismissing job {}", job_id);
    match data.runtime.dismiss(job_id).await {
        Ok(state) => Ok(HttpResponse::Ok().json(JobResponse {
            job_id,
            status: Some(state),
        })),
        Err(e) => Ok(error_response(e)),
    }
}

/// WebSocket endpoint for real-time execution events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

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

/// List registered backend kinds
#[get("/api/backends")]
async fn list_backends(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let backends = data.runtime.backends();

    let kinds: Vec<_> = backends
        .list_kinds()
        .iter()
        .map(|kind| {
            let metadata = backends.get_metadata(kind);
            serde_json::json!({
                "kind": kind,
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(kinds))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting chain process server");

    let mut backends = chainruntime::BackendRegistry::new();
    chainbackends::register_all(&mut backends);

    let runtime = ProcessingRuntime::new(Arc::new(backends));

    info!("Runtime initialized with standard backends");

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("Server starting on http://{}", bind_address);

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
            .service(list_processes)
            .service(deploy_process)
            .service(clear_processes)
            .service(describe_process)
            .service(execute_process)
            .service(job_status)
            .service(job_result)
            .service(dismiss_job)
            .service(websocket_events)
            .service(list_backends)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

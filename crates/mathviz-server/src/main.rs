//! HTTP server entry point and Axum router setup.
//!
//! Loads settings, prints the startup banner, prepares the output volume and
//! serves the job API on `0.0.0.0:<PORT>`. Any startup failure exits non-zero.

mod dto;
mod error;
mod handlers;
mod services;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use mathviz_config::Settings;
use mathviz_engine::{JobStore, Pipeline};
use mathviz_llm::UnifiedLlmClient;
use mathviz_storage::R2Storage;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "MathViz Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub settings: Arc<Settings>,
    pub jobs: Arc<JobStore>,
    pub pipeline: Arc<Pipeline>,
}

impl ServerState {
    pub fn new(settings: Arc<Settings>, pipeline: Pipeline) -> Self {
        Self {
            jobs: Arc::clone(pipeline.jobs()),
            pipeline: Arc::new(pipeline),
            settings,
        }
    }
}

/// Diagnostic lines printed before the server binds.
pub fn banner(settings: &Settings) -> String {
    let rule = "=".repeat(48);
    [
        rule.clone(),
        format!(" {} v{}", SERVICE_NAME, VERSION),
        format!(" Runtime:    Rust ({}-{})", std::env::consts::OS, std::env::consts::ARCH),
        " Server:     axum 0.8 on tokio (single process)".to_string(),
        format!(" Port:       {}", settings.port),
        format!(" Output dir: {}", settings.output_dir.display()),
        rule,
    ]
    .join("\n")
}

/// Builds the router with CORS and request tracing.
pub fn app(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/generate", post(handlers::jobs::generate))
        .route("/status/{job_id}", get(handlers::jobs::status))
        .route("/jobs", get(handlers::jobs::list))
        .route("/output/{filename}", get(handlers::output::download))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// Wires the pipeline from settings: LLM, R2 and the job store.
async fn init_server_state(settings: Settings) -> ServerState {
    let settings = Arc::new(settings);
    let mut pipeline = Pipeline::new(Arc::clone(&settings), Arc::new(JobStore::new()));

    match UnifiedLlmClient::new(&settings.llm_provider, &settings.llm_model, &settings.llm_api_key) {
        Ok(client) => {
            info!("LLM: {}/{}", settings.llm_provider, settings.llm_model);
            pipeline = pipeline.with_llm(Arc::new(client));
        }
        Err(e) => warn!("LLM unavailable, jobs will fail at planning: {}", e),
    }

    let storage = R2Storage::from_settings(&settings).await;
    match &storage {
        Some(r2) => info!("R2 uploads enabled (bucket '{}')", r2.bucket()),
        None => info!("R2 not configured, videos are served from /output"),
    }

    ServerState::new(Arc::clone(&settings), pipeline.with_storage(storage))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let settings = Settings::from_env()?;
    println!("{}", banner(&settings));

    settings.ensure_dirs()?;
    let addr = settings.bind_addr();
    let state = Arc::new(init_server_state(settings).await);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

//! Gateway server: campaign session stream plus the single-shot endpoints

use crate::ws::handle_session;
use axum::{
    extract::{Path as AxumPath, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Datelike;
use dashmap::DashMap;
use foundry_agent::{
    display_company, generate_landing_page, infer_plan, GraphRunner, LandingInputs, NodeContext,
};
use foundry_core::{
    Credentials, DeployRequest, FoundryConfig, InferPlanRequest, RegenerateLandingPageRequest,
    SessionKey,
};
use foundry_llm::{LlmProvider, OpenAiCompatProvider};
use foundry_tools::{create_default_adapters, is_safe_artifact_name, Adapters};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared by every connection and request.
pub struct AppState {
    pub runner: Arc<GraphRunner>,
    pub output_dir: PathBuf,
    /// Live campaign sessions and their cancellation handles.
    pub sessions: DashMap<SessionKey, CancellationToken>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        adapters: Adapters,
        config: &FoundryConfig,
    ) -> foundry_core::Result<Self> {
        let ctx = NodeContext::new(provider, adapters, config);
        Ok(Self {
            runner: Arc::new(GraphRunner::campaign(ctx)?),
            output_dir: config.output.dir.clone(),
            sessions: DashMap::new(),
            started_at: Instant::now(),
        })
    }

    fn ctx(&self) -> &NodeContext {
        self.runner.context()
    }

    /// Cancel every live session, e.g. on shutdown.
    pub fn cancel_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().cancel();
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws_stream_campaign", get(ws_handler))
        .route("/infer_plan", post(infer_plan_handler))
        .route("/regenerate_landing_page", post(regenerate_handler))
        .route("/download_brd/:filename", get(download_brd_handler))
        .route("/deploy_to_vercel", post(deploy_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

pub async fn start_gateway(config: FoundryConfig, creds: Credentials) -> anyhow::Result<()> {
    let api_key = creds
        .groq_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("GROQ_API_KEY not set"))?;

    let provider = OpenAiCompatProvider::new(api_key)
        .with_base_url(&config.llm.base_url)
        .with_timeout(config.timeouts.llm());
    let adapters = create_default_adapters(&config, &creds);
    let state = Arc::new(AppState::new(Arc::new(provider), adapters, &config)?);
    let app = build_router(state.clone());

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    info!("Campaign Foundry v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Stream:    ws://{}/ws_stream_campaign", bind_addr);
    info!("  Model:     {} @ {}", config.llm.model, config.llm.base_url);
    info!("  Outputs:   {}", config.output.dir.display());
    info!("  Credentials: {:?}", creds.present());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!(sessions = state.sessions.len(), "Shutting down");
    state.cancel_all();
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn index_handler() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html><html><head><title>Campaign Foundry</title>
<style>
body {{ font-family: monospace; background: #1a1a2e; color: #eee; padding: 20px; max-width: 900px; margin: 0 auto; }}
h1 {{ color: #f39c12; }} code {{ background: #0f3460; padding: 2px 6px; border-radius: 4px; }}
.info {{ background: #16213e; padding: 15px; border-radius: 8px; margin: 15px 0; }}
</style></head><body>
<h1>Campaign Foundry v{version}</h1>
<div class="info">
<p>Stream: <code>GET /ws_stream_campaign</code> (WebSocket)</p>
<p>Plan preview: <code>POST /infer_plan</code></p>
<p>Landing page: <code>POST /regenerate_landing_page</code></p>
<p>BRD download: <code>GET /download_brd/{{filename}}</code></p>
<p>Deploy: <code>POST /deploy_to_vercel</code></p>
<p>Status: <code>GET /health</code></p>
</div>
</body></html>"#,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// `POST /infer_plan`: planner only, no session.
async fn infer_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InferPlanRequest>,
) -> Json<Value> {
    match infer_plan(&state.ctx().llm, &req.initial_prompt).await {
        Ok(plan) => Json(json!({ "success": true, "plan": plan })),
        Err(e) => {
            error!("infer_plan failed: {}", e);
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

/// `POST /regenerate_landing_page`: web step alone, at the regeneration temperature.
async fn regenerate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegenerateLandingPageRequest>,
) -> Json<Value> {
    let inputs = LandingInputs {
        company_name: display_company(req.company_name.as_deref(), req.topic.as_deref()),
        topic: req.topic.unwrap_or_default(),
        audience_persona: req.audience_persona,
        core_messaging: req.core_messaging,
        generated_assets: req.generated_assets.unwrap_or_default(),
    };
    let year = chrono::Local::now().year();

    match generate_landing_page(&state.ctx().regen_llm, &inputs, year).await {
        Ok(html) => Json(json!({ "success": true, "html": html })),
        Err(e) => {
            error!("Landing page regeneration failed: {}", e);
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid filename")]
    InvalidFilename,

    #[error("File not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidFilename => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `GET /download_brd/:filename`: a bare file name under the output directory.
async fn download_brd_handler(
    AxumPath(filename): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    if !is_safe_artifact_name(&filename) {
        warn!("Rejected artifact name {:?}", filename);
        return Err(ApiError::InvalidFilename);
    }

    let path = state.output_dir.join(&filename);
    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// `POST /deploy_to_vercel`
async fn deploy_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeployRequest>,
) -> Json<Value> {
    match state
        .ctx()
        .adapters
        .deployer
        .deploy(&req.project_name, &req.html_content)
        .await
    {
        Ok(d) => {
            info!("Deployed {} to {}", req.project_name, d.url);
            Json(json!({ "success": true, "url": d.url, "id": d.id, "name": d.name }))
        }
        Err(e) => {
            let mut body = json!({ "error": e.to_string() });
            if let Some(code) = e.status_code() {
                body["status_code"] = json!(code);
            }
            Json(body)
        }
    }
}

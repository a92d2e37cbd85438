//! HTTP API server.

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lif_plan::{CompileConfig, Compiler};
use lif_runtime::{Deployer, DockerCompose, Orchestrator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Content type of manifest responses
pub const YAML_CONTENT_TYPE: &str = "text/yaml";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Compile configuration used for every request
    pub compile: CompileConfig,
    /// Whether deploys return once services are running
    pub detach: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8085".to_string(),
            compile: CompileConfig::default(),
            detach: true,
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    compiler: Arc<Compiler>,
    deployer: Deployer,
}

impl AppState {
    /// Create state from a compiler and a deployer
    #[must_use]
    pub fn new(compiler: Compiler, deployer: Deployer) -> Self {
        Self {
            compiler: Arc::new(compiler),
            deployer,
        }
    }
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `running`
    pub status: String,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/compile", post(compile))
        .route("/deploy", post(deploy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
    })
}

async fn compile(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let yaml = state.compiler.compile(&body)?.manifest.to_yaml()?;
    Ok(([(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], yaml).into_response())
}

async fn deploy(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let compilation = state.compiler.compile(&body)?;
    let report = state.deployer.deploy(&compilation.manifest).await?;
    let text = format!(
        "Successfully deployed infrastructure:\n\n{}",
        report.manifest_yaml
    );
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

/// API server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a server that deploys with `docker compose`
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_orchestrator(config, Arc::new(DockerCompose::new()))
    }

    /// Create a server with a given orchestrator
    #[must_use]
    pub fn with_orchestrator(config: ServerConfig, orchestrator: Arc<dyn Orchestrator>) -> Self {
        let compiler = Compiler::new(config.compile.clone());
        let deployer = Deployer::new(orchestrator).with_detach(config.detach);
        Self {
            state: AppState::new(compiler, deployer),
            config,
        }
    }

    /// The router this server serves
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind and serve until the process exits
    ///
    /// # Errors
    ///
    /// Returns error if binding or serving fails
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.config.bind).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router()).await
    }
}

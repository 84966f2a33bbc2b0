//! JSON HTTP surface of the service.

use crate::config::Config;
use crate::error::{Result, ServiceError};
use crate::harvest::GitHubHarvester;
use crate::llm::{GeminiClient, SageMakerEndpoint};
use crate::pipeline::DiagramPipeline;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<DiagramPipeline>,
}

impl AppState {
    /// Wraps a pipeline for the handlers
    pub fn new(pipeline: DiagramPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Body of `POST /generate-diagram`
///
/// Absent and `null` fields are both treated as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiagramRequest {
    /// Free-form description of a codebase
    pub explanation: Option<String>,
}

/// Body of `POST /analyze-url`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeUrlRequest {
    /// Repository to harvest
    pub repo_url: Option<String>,
}

/// Body of `POST /analyze`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    /// Echoed back to the caller
    pub repo_url: Option<String>,
    /// Explanation to diagram
    pub explanation: Option<String>,
}

/// The field's text, or the 400 error when it is missing, null or empty
fn required(field: Option<String>, message: &'static str) -> std::result::Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingField(message))
}

/// Handler failure rendered as JSON
#[derive(Debug)]
pub enum ApiError {
    /// A required field was empty
    MissingField(&'static str),
    /// The pipeline failed
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingField(message) => {
                (StatusCode::BAD_REQUEST, ResponseJson(json!({ "error": message }))).into_response()
            }
            ApiError::Service(e) => {
                error!("Request failed: {}", e);
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (
                    status,
                    ResponseJson(json!({
                        "success": false,
                        "error": e.to_string()
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Create the main application with all routes
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-diagram", post(generate_diagram))
        .route("/analyze-url", post(analyze_url))
        .route("/analyze", post(analyze))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the model clients from `config`, binds the listener and serves requests
pub async fn serve(config: Config) -> Result<()> {
    let harvester = GitHubHarvester::with_base_urls(&config.github.api_base, &config.github.raw_base)?;
    let generator = GeminiClient::new(config.gemini.clone())?;
    info!("Gemini API configured with model: {}", config.gemini.model);
    let endpoint = SageMakerEndpoint::new(&config.inference).await;

    let pipeline = DiagramPipeline::new(
        harvester,
        Arc::new(generator),
        Arc::new(endpoint),
        config.settings.harvest.clone(),
        config.settings.model.clone(),
        config.github.token.clone(),
    );
    let app = create_app(AppState::new(pipeline));

    let addr = format!("{}:{}", config.settings.server.host, config.settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check endpoint
async fn health() -> ResponseJson<Value> {
    ResponseJson(json!({ "status": "healthy" }))
}

/// Converts a codebase explanation into Mermaid source
async fn generate_diagram(
    State(state): State<AppState>,
    Json(request): Json<DiagramRequest>,
) -> std::result::Result<ResponseJson<Value>, ApiError> {
    let explanation = required(request.explanation, "No explanation provided")?;

    let mermaid = state.pipeline.diagram_from_explanation(&explanation).await?;
    Ok(ResponseJson(json!({
        "success": true,
        "mermaid": mermaid
    })))
}

/// Harvests a repository, explains it and diagrams the explanation
async fn analyze_url(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeUrlRequest>,
) -> std::result::Result<ResponseJson<Value>, ApiError> {
    let repo_url = required(request.repo_url, "No repository URL provided")?;

    let analysis = state.pipeline.analyze_repository(&repo_url).await?;
    Ok(ResponseJson(json!({
        "success": true,
        "repo_url": analysis.repo_url,
        "explanation": analysis.explanation,
        "mermaid": analysis.mermaid
    })))
}

/// Diagrams an explanation supplied by the caller
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> std::result::Result<ResponseJson<Value>, ApiError> {
    let explanation = required(request.explanation, "No explanation provided")?;

    let mermaid = state.pipeline.diagram_from_explanation(&explanation).await?;
    Ok(ResponseJson(json!({
        "success": true,
        "repo_url": request.repo_url.unwrap_or_default(),
        "explanation": explanation,
        "mermaid": mermaid
    })))
}

//! HTTP Handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use agentloop_core::{
    error::AgentError,
    reasoning::AgentResponse,
    tool::ToolDefinition,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Error returned by handlers
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: "invalid_request",
                message: message.into(),
            },
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        let (status, error) = match &e {
            AgentError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AgentError::ToolNotFound(_) | AgentError::Tool(_) | AgentError::ToolExecution { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "tool_error")
            }
            AgentError::Transport { .. } | AgentError::InvalidResponse { .. } => {
                (StatusCode::BAD_GATEWAY, "provider_error")
            }
            AgentError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        Self {
            status,
            body: ErrorResponse {
                error,
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.factory.config().provider.to_string(),
        model: state.factory.model_name(),
    })
}

/// Definitions of the registered tools
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.factory.tools().definitions())
}

/// Run a fresh agent on one message
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let mut builder = state.factory.builder("http");
    if let Some(prompt) = payload.system_prompt.filter(|p| !p.trim().is_empty()) {
        builder = builder.system_prompt(prompt);
    }
    let mut agent = builder.build()?;

    let response = agent.execute(payload.message).await.map_err(|e| {
        tracing::error!("Agent error: {}", e);
        ApiError::from(e)
    })?;

    tracing::info!(
        iterations = response.iterations(),
        tools = response.tool_calls().len(),
        capped = response.is_capped(),
        "Chat completed"
    );

    Ok(Json(response))
}

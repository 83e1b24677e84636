//! HTTP 接口
//!
//! POST /chat 跑一轮对话；POST /memory 提交后台记忆处理并立即返回 202；
//! GET /health、GET /tools 供探活与查看已注册工具。

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, TurnOptions};
use crate::core::AgentError;
use crate::memory::ChatMessage;
use crate::react::ToolCallRecord;

/// HTTP 服务状态
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub use_memory: Option<bool>,
    pub model: Option<String>,
    pub max_tool_loops: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub sleep: bool,
    pub tool_history: Vec<ToolCallRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MemoryRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemoryAccepted {
    pub status: &'static str,
    pub message: String,
    pub request_id: String,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: &str) -> ApiError {
    (status, Json(serde_json::json!({ "error": message })))
}

/// 创建路由
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/memory", post(memory))
        .route("/health", get(health))
        .route("/tools", get(tools))
        .with_state(state)
}

/// POST /chat
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.messages.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "messages must not be empty"));
    }

    let defaults = state.agent.default_options();
    let options = TurnOptions {
        use_memory: req.use_memory.unwrap_or(defaults.use_memory),
        model: req.model.filter(|m| !m.trim().is_empty()).unwrap_or(defaults.model),
        max_tool_loops: req.max_tool_loops.unwrap_or(defaults.max_tool_loops),
    };

    match state.agent.run_turn(&req.messages, &options).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            message: ChatMessage::assistant(outcome.content),
            sleep: outcome.sleep,
            tool_history: outcome.tool_history,
        })),
        Err(AgentError::InvalidRequest(msg)) => Err(error_response(StatusCode::BAD_REQUEST, &msg)),
        Err(e) => {
            tracing::error!(error = %e, "chat turn failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
        }
    }
}

/// POST /memory：处理在后台进行，调用方不等待结果
async fn memory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MemoryRequest>,
) -> (StatusCode, Json<MemoryAccepted>) {
    let model = req
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.agent.default_options().model);
    let count = req.messages.len();
    let handle = state.agent.submit_memory(req.messages, model);
    let request_id = handle.request_id().to_string();
    tracing::info!(request_id = %request_id, messages = count, "memory processing accepted");

    (
        StatusCode::ACCEPTED,
        Json(MemoryAccepted {
            status: "accepted",
            message: format!("Memory processing started for {} messages", count),
            request_id,
        }),
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn tools(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "tools": state.agent.tool_names() }))
}

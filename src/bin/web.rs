//! MirrorBot Web 传输层
//!
//! 启动: cargo run --bin mirrorbot-web --features web
//! REST: GET /session、POST /chat；WebSocket: /ws/:session_id

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{Html, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use mirrorbot::config::load_config_or_default;
use mirrorbot::memory::InMemoryHistoryStore;
use mirrorbot::prompts::EntrySource;
use mirrorbot::{observability, OrchestratorBuilder, TurnOrchestrator};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<TurnOrchestrator>,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(default)]
    entry_source: EntrySource,
    #[serde(default)]
    statement: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_id: String,
    greeting: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    session_id: Option<String>,
    user_message: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

/// WebSocket 入站帧
#[derive(Debug, Deserialize)]
struct WsInbound {
    user_message: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct WsOutbound<'a> {
    role: &'static str,
    content: &'a str,
}

async fn index() -> Html<&'static str> {
    Html("<h1>MirrorBot</h1><p>POST /chat or connect to /ws/{session_id}</p>")
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn open_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Json<SessionResponse> {
    let session_id = TurnOrchestrator::new_session_id();
    let greeting = state
        .orchestrator
        .open_session(&session_id, query.entry_source, query.statement.as_deref())
        .await;
    Json(SessionResponse { session_id, greeting })
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(TurnOrchestrator::new_session_id);
    let outcome = state
        .orchestrator
        .process_turn(&session_id, &req.user_message, req.location.as_deref())
        .await;
    Json(ChatResponse {
        session_id,
        reply: outcome.reply,
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

async fn handle_socket(mut socket: WebSocket, session_id: String, state: AppState) {
    tracing::info!(session = %session_id, "WebSocket connected");
    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(session = %session_id, "WebSocket receive error: {}", e);
                break;
            }
        };
        let inbound: WsInbound = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(session = %session_id, "bad frame ignored: {}", e);
                continue;
            }
        };
        let outcome = state
            .orchestrator
            .process_turn(&session_id, &inbound.user_message, inbound.location.as_deref())
            .await;
        let payload = match serde_json::to_string(&WsOutbound {
            role: "assistant",
            content: &outcome.reply,
        }) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("encode reply failed: {}", e);
                continue;
            }
        };
        if socket.send(WsMessage::Text(payload)).await.is_err() {
            break;
        }
    }
    tracing::info!(session = %session_id, "WebSocket closed");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config_or_default(None);
    let bind = cfg.server.bind.clone();
    let orchestrator = OrchestratorBuilder::new(cfg)
        .with_history(Arc::new(InMemoryHistoryStore::new()))
        .build()
        .context("Failed to build turn pipeline")?;

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    let app = Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/session", get(open_session))
        .route("/chat", post(chat))
        .route("/ws/:session_id", get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    tracing::info!("MirrorBot web listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

//! Chat routes: streamed turns and session history

use super::AppState;
use super::error::AppError;
use agent_llm::{Message, Role};
use agent_runtime::{ExecutorEventHandler, ToolAgent};
use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// A rendered turn in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

fn sse_event(name: &str, data: &Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

/// Forwards executor progress to the SSE stream
struct SseEventHandler {
    tx: UnboundedSender<Event>,
}

impl SseEventHandler {
    fn send(&self, event: Event) {
        // The browser may have gone away; the turn still completes
        let _ = self.tx.unbounded_send(event);
    }
}

#[async_trait]
impl ExecutorEventHandler for SseEventHandler {
    fn on_text_delta(&self, delta: &str) {
        self.send(sse_event("delta", &json!({ "text": delta })));
    }

    async fn on_tool_start(&self, _id: &str, name: &str, _input: &Value) {
        self.send(sse_event("tool", &json!({ "name": name, "status": "started" })));
    }

    async fn on_tool_done(
        &self,
        _id: &str,
        name: &str,
        result: Result<&Value, &str>,
        duration_ms: u64,
    ) {
        let status = if result.is_ok() { "done" } else { "failed" };
        self.send(sse_event(
            "tool",
            &json!({ "name": name, "status": status, "duration_ms": duration_ms }),
        ));
    }
}

/// POST /api/chat
///
/// Streams `session`, then `delta`/`tool` events, then `done` or `error`.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let (session_id, session) = state
        .sessions
        .get_or_create(request.session_id.as_deref())
        .await;
    info!(session_id = %session_id, message_len = message.len(), "POST /api/chat");

    let (tx, rx) = unbounded();
    let handler = SseEventHandler { tx };
    handler.send(sse_event("session", &json!({ "session_id": session_id })));

    let agent = state.agent.clone();
    tokio::spawn(async move {
        let handler = Arc::new(handler);
        let mut context = session.lock().await;
        let outcome = agent
            .chat(message, &mut context, Some(handler.clone() as Arc<dyn ExecutorEventHandler>))
            .await;
        drop(context);

        match outcome {
            Ok(reply) => handler.send(sse_event("done", &json!({ "reply": reply }))),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Chat turn failed");
                handler.send(sse_event("error", &json!({ "message": e.to_string() })));
            }
        }
    });

    Ok(Sse::new(rx.map(Ok)).keep_alive(KeepAlive::default()))
}

/// GET /api/sessions/:id/messages
#[axum::debug_handler]
pub async fn session_messages(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(AppError::NotFound)?;
    let context = session.lock().await;
    let history = ToolAgent::history(&context)?;
    Ok(Json(transcript(&history)))
}

/// User and assistant text turns, leaving out tool traffic
pub fn transcript(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .filter_map(|m| {
            let content = m.text().filter(|t| !t.trim().is_empty())?;
            Some(ChatMessage {
                role: m.role,
                content,
            })
        })
        .collect()
}

//! Browser chat UI served with axum

pub mod chat;
pub mod error;

pub use chat::{ChatMessage, ChatRequest, transcript};
pub use error::AppError;

use crate::agent::InvestorAgent;
use crate::error::Result;
use crate::session::SessionStore;
use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<InvestorAgent>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// State with a fresh session store
    pub fn new(agent: Arc<InvestorAgent>) -> Self {
        Self {
            agent,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

/// The chat UI router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat))
        .route("/api/sessions/:id/messages", get(chat::session_messages))
        .with_state(state)
}

/// Serve the chat UI on `addr` until the process stops
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Chat UI listening");
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

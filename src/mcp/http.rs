//! HTTP transports - SSE sessions and stateless streamable HTTP
//!
//! Provides:
//! - `GET /sse` + `POST /messages/?session_id=` (server-sent events)
//! - `POST /mcp` (one JSON-RPC message in, one JSON response out)
//!
//! Both routers share one `McpServer`, and so one Dispatcher and client.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::{Stream, StreamExt, stream};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, mpsc};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::error::{BangumiError, Result};

use super::session::McpServer;

type Sessions = Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>;

#[derive(Clone)]
struct AppState {
    server: McpServer,
    sessions: Sessions,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// Removes its session when the event stream is dropped
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        let sessions = Arc::clone(&self.sessions);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                sessions.write().await.remove(&id);
                info!("SSE session {} closed", id);
            });
        }
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router for the SSE transport
pub fn sse_router(server: McpServer) -> Router {
    let state = AppState {
        server,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/sse", get(open_sse))
        .route("/messages/", post(post_message))
        .route("/messages", post(post_message))
        .with_state(state)
        .layer(cors())
}

/// Router for the stateless streamable HTTP transport
pub fn streamable_router(server: McpServer) -> Router {
    let state = AppState {
        server,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/mcp", post(post_mcp))
        .with_state(state)
        .layer(cors())
}

/// Serve the SSE transport until Ctrl-C
pub async fn run_sse(server: McpServer, host: &str, port: u16) -> Result<()> {
    serve(sse_router(server), host, port, "/sse").await
}

/// Serve the streamable HTTP transport until Ctrl-C
pub async fn run_streamable_http(server: McpServer, host: &str, port: u16) -> Result<()> {
    serve(streamable_router(server), host, port, "/mcp").await
}

async fn serve(app: Router, host: &str, port: u16, path: &str) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| BangumiError::Config(format!("Failed to bind {}:{}: {}", host, port, e)))?;
    info!("Serving MCP on http://{}:{}{}", host, port, path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn open_sse(State(state): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<String>(32);
    state.sessions.write().await.insert(session_id.clone(), tx);
    info!("SSE session {} opened", session_id);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages/?session_id={}", session_id));
    let guard = SessionGuard {
        id: session_id,
        sessions: Arc::clone(&state.sessions),
    };
    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let json = rx.recv().await?;
        Some((Ok::<_, Infallible>(Event::default().event("message").data(json)), (rx, guard)))
    });

    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages);
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    let sender = state.sessions.read().await.get(&query.session_id).cloned();
    let Some(tx) = sender else {
        warn!("Message for unknown session {}", query.session_id);
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let server = state.server.clone();
    tokio::spawn(async move {
        let Some(response) = server.handle_message(&body).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(json) => {
                if tx.send(json).await.is_err() {
                    debug!("SSE session closed before response was sent");
                }
            }
            Err(e) => error!("Failed to encode response: {}", e),
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

async fn post_mcp(State(state): State<AppState>, body: String) -> Response {
    match state.server.handle_message(&body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

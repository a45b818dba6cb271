//! Development server implementation.
//!
//! Serves the source tree verbatim over plain HTTP, injecting the live
//! reload client into HTML documents.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::reload::{reload_client_script, ReloadHub, ReloadMessage};

/// Marker injected before, replacing the closing body tag.
const INJECT_TAG: &str = "<script src=\"/__livereload.js\"></script></body>";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Document root (the markup source tree)
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("src"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}: {1}")]
    InvalidAddr(String, String),

    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Shared server state.
struct ServerState {
    root: PathBuf,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Start serving. Runs until the process terminates.
    ///
    /// The hub is shared with whoever triggers reloads (the watch loop).
    pub async fn start(self, hub: ReloadHub) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddr(addr_str, e.to_string()))?;

        let state = Arc::new(ServerState {
            root: self.config.root.clone(),
            hub,
        });

        let app = Router::new()
            .route("/__livereload", get(ws_handler))
            .route("/__livereload.js", get(script_handler))
            .fallback(static_handler)
            .with_state(state);

        tracing::info!("Dev server at http://{}", addr);

        if self.config.open {
            let _ = open::that(format!("http://{}", addr));
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        Ok(())
    }
}

/// Serve a file from the source tree, injecting the reload client into HTML.
async fn static_handler(State(state): State<Arc<ServerState>>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let wants_html = path.ends_with('/') || path.ends_with(".html");

    let resp = match ServeDir::new(&state.root).oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    };

    if !wants_html || !resp.status().is_success() {
        return resp;
    }

    inject_reload_script(resp).await
}

/// Rewrite an HTML response body to load the reload client.
async fn inject_reload_script(resp: Response) -> Response {
    let (mut parts, body) = resp.into_parts();

    let bytes = match axum::body::to_bytes(body, 8 * 1024 * 1024).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return Response::builder()
                .status(500)
                .body(Body::empty())
                .expect("static response");
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = if html.contains("</body>") {
        html.replacen("</body>", INJECT_TAG, 1)
    } else {
        format!("{}{}", html, INJECT_TAG)
    };

    // Length changed; let axum recompute it
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}

/// Handler for the reload client script.
async fn script_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/javascript")],
        reload_client_script(),
    )
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward hub messages to one connected client.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let msg = serde_json::to_string(&ReloadMessage::Connected).expect("static message");
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload_msg) = rx.recv().await {
        let json = serde_json::to_string(&reload_msg).expect("enum serializes");
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serves_source_tree() {
        let config = DevServerConfig::default();
        assert_eq!(config.root, PathBuf::from("src"));
        assert_eq!(config.port, 3000);
    }

    #[tokio::test]
    async fn injects_before_closing_body_tag() {
        let resp = Response::new(Body::from("<html><body>hi</body></html>"));
        let injected = inject_reload_script(resp).await;

        let bytes = axum::body::to_bytes(injected.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(html.contains("hi<script src=\"/__livereload.js\"></script></body>"));
    }

    #[tokio::test]
    async fn appends_when_no_body_tag() {
        let resp = Response::new(Body::from("<p>fragment</p>"));
        let injected = inject_reload_script(resp).await;

        let bytes = axum::body::to_bytes(injected.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(html.starts_with("<p>fragment</p>"));
        assert!(html.contains("/__livereload.js"));
    }
}

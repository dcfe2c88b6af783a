//! WebSocket upgrade route.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Connection parameters.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Caller name, used only for logging
    #[serde(default = "default_client")]
    pub client: String,
}

fn default_client() -> String {
    "anonymous".to_string()
}

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - Open a client session.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| {
        handle_websocket_connection(
            socket,
            state.service,
            state.conn_manager,
            state.reset,
            params.client,
        )
    })
}

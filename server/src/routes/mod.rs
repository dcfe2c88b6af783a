//! HTTP route definitions.

mod health;
mod status;
mod ws;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(status::routes())
        .merge(ws::routes())
}

//! Platform status endpoint.

use axum::{extract::State, routing::get, Json, Router};
use fwupdate_engine::{ReconcileReport, SystemId, UpdateState};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::AppState;

/// Snapshot of the persisted platform record.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub dual_system: bool,
    pub active: SystemId,
    pub update: SystemId,
    pub synced: bool,
    pub update_state: UpdateState,
    pub boot_count: u64,
    pub pending_nvup: usize,
    pub startup: ReconcileReport,
    pub resetting: bool,
    pub connections: usize,
    pub state_path: String,
}

/// Create status routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

/// GET /status - Current roles, sync flag and startup result.
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let service = state.service.clone();
    let connections = state.conn_manager.connection_count();
    let state_path = state.config.state_path.display().to_string();

    let response = tokio::task::spawn_blocking(move || {
        let service = service
            .lock()
            .map_err(|_| AppError::Internal("service lock poisoned".to_string()))?;
        let store = service.adapter().store();
        let roles = store.roles();

        Ok::<_, AppError>(StatusResponse {
            dual_system: store.dual_system,
            active: roles.active(),
            update: roles.update(),
            synced: store.synced,
            update_state: store.update_state,
            boot_count: store.boot_count,
            pending_nvup: store.pending_nvup.len(),
            startup: service.startup_report().clone(),
            resetting: service.is_resetting(),
            connections,
            state_path,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(response))
}

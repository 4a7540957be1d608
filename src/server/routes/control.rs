//! Status, lifecycle signals and manual maintenance.

use crate::db::StorageMetadata;
use crate::error::OrbitError;
use crate::migration::MigrationResult;
use crate::retention::CleanupResult;
use crate::server::router::OrbitState;
use crate::sync::SyncSnapshot;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<OrbitState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/visibility", post(visibility))
        .route("/api/cleanup", post(cleanup))
        .route("/api/migration/notice", delete(dismiss_migration_notice))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub metadata: StorageMetadata,
    pub sync: SyncSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_notice: Option<MigrationResult>,
}

async fn status(State(state): State<OrbitState>) -> Result<Json<StatusBody>, OrbitError> {
    let metadata = state.store.metadata.get().await?;
    let sync = state.sync.snapshot().await?;
    let migration_notice = state.migration_notice.current().await;
    Ok(Json(StatusBody {
        metadata,
        sync,
        migration_notice,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VisibilitySignal {
    pub hidden: bool,
}

/// POST /api/visibility
///
/// Hidden pauses background sync, visible resumes it.
async fn visibility(
    State(state): State<OrbitState>,
    Json(signal): Json<VisibilitySignal>,
) -> Result<Json<SyncSnapshot>, OrbitError> {
    if signal.hidden {
        state.sync.pause().await?;
    } else {
        state.sync.resume().await?;
    }
    info!(hidden = signal.hidden, "visibility signal applied");
    Ok(Json(state.sync.snapshot().await?))
}

async fn cleanup(State(state): State<OrbitState>) -> Result<Json<Vec<CleanupResult>>, OrbitError> {
    Ok(Json(state.retention.run_cleanup_checked().await?))
}

async fn dismiss_migration_notice(State(state): State<OrbitState>) -> StatusCode {
    if state.migration_notice.dismiss().await {
        info!("migration notice dismissed");
    }
    StatusCode::NO_CONTENT
}

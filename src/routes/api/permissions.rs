use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    auth::{PermissionsEdit, PermissionsView},
    engine::gaps::{GapAnalysis, MigrationScript, PermissionChange},
    middleware::RequirePermission,
    response::{ApiResult, JsonApiResponse},
    services::ServiceContext,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MigrationRequest {
    pub changes: Vec<PermissionChange>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/permissions/gaps", get(gaps))
        .route("/permissions/migration", post(migration))
        .with_state(state)
}

async fn gaps(
    State(state): State<Arc<AppState>>,
    _guard: RequirePermission<PermissionsView>,
) -> ApiResult<GapAnalysis> {
    let analysis = ServiceContext::from_state(&state)
        .permissions()
        .analyze_gaps()
        .await?;
    JsonApiResponse::ok(analysis)
}

async fn migration(
    State(state): State<Arc<AppState>>,
    _guard: RequirePermission<PermissionsEdit>,
    Json(request): Json<MigrationRequest>,
) -> ApiResult<MigrationScript> {
    let script = ServiceContext::from_state(&state)
        .permissions()
        .export_migration(&request.changes)?;
    JsonApiResponse::ok(script)
}

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    auth::{TablesSync, TablesView},
    engine::metadata::TableConfig,
    middleware::RequirePermission,
    response::{ApiResult, JsonApiResponse},
    services::{ServiceContext, StoredTableConfig, SyncReport},
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tables/sync", post(sync_all))
        .route("/tables/metadata", get(list_metadata))
        .route("/tables/{table}/sync", post(sync_table))
        .route("/tables/{table}/metadata", get(table_metadata))
        .with_state(state)
}

async fn sync_all(
    State(state): State<Arc<AppState>>,
    guard: RequirePermission<TablesSync>,
) -> ApiResult<SyncReport> {
    let report = ServiceContext::from_state(&state)
        .metadata()
        .sync_all(guard.claims.workspace)
        .await?;
    JsonApiResponse::ok(report)
}

async fn sync_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    guard: RequirePermission<TablesSync>,
) -> ApiResult<TableConfig> {
    let config = ServiceContext::from_state(&state)
        .metadata()
        .sync_table(guard.claims.workspace, &table)
        .await?;
    JsonApiResponse::ok(config)
}

async fn list_metadata(
    State(state): State<Arc<AppState>>,
    guard: RequirePermission<TablesView>,
) -> ApiResult<Vec<StoredTableConfig>> {
    let configs = ServiceContext::from_state(&state)
        .metadata()
        .list_configs(guard.claims.workspace)
        .await?;
    JsonApiResponse::ok(configs)
}

async fn table_metadata(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    guard: RequirePermission<TablesView>,
) -> ApiResult<TableConfig> {
    let config = ServiceContext::from_state(&state)
        .metadata()
        .table_metadata(guard.claims.workspace, &table)
        .await?;
    JsonApiResponse::ok(TableConfig::clone(&config))
}

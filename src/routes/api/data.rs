use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::DataView,
    middleware::RequirePermission,
    response::{ApiResult, JsonApiResponse},
    services::{DataPage, ServiceContext},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub table: String,
    #[serde(rename = "idColumn")]
    pub id_column: Option<String>,
    pub id: String,
}

// `/data/record` is registered first so it wins over a table named `record`.
// Guards run before the query extractors, so a missing token is 401 even when
// the query string is malformed.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/data/record", get(find_record))
        .route("/data/{table}", get(query_table))
        .with_state(state)
}

async fn query_table(
    State(state): State<Arc<AppState>>,
    guard: RequirePermission<DataView>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<DataPage> {
    let page = ServiceContext::from_state(&state)
        .data()
        .query(guard.claims.workspace, &table, &params)
        .await?;
    JsonApiResponse::ok(page)
}

async fn find_record(
    State(state): State<Arc<AppState>>,
    guard: RequirePermission<DataView>,
    Query(query): Query<RecordQuery>,
) -> ApiResult<serde_json::Value> {
    let record = ServiceContext::from_state(&state)
        .data()
        .find_record(
            guard.claims.workspace,
            &query.table,
            query.id_column.as_deref(),
            &query.id,
        )
        .await?;

    match record {
        Some(record) => JsonApiResponse::ok(json!({ "record": record })),
        None => JsonApiResponse::with_status(
            StatusCode::NOT_FOUND,
            "Record not found",
            json!({ "record": null }),
        ),
    }
}

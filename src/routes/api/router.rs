use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{data, permissions, public, tables};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::router())
        .merge(tables::router(state.clone()))
        .merge(data::router(state.clone()))
        .merge(permissions::router(state))
}

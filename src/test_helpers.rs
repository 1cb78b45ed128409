use std::sync::Arc;

use axum::{Router, middleware};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    auth::jwt::{JwtKeys, encode_token, make_access_claims},
    config::AppConfig,
    middleware::{catch_panic_layer, json_error_middleware},
    routes::router,
    state::AppState,
};

/// Defaults plus the given signing secret; never reads the environment.
pub fn test_config(secret: &[u8]) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = String::from_utf8_lossy(secret).into_owned();
    cfg
}

/// The full router with production middleware over the given (usually mock) store.
pub fn test_router(db: DatabaseConnection, secret: &[u8]) -> Router {
    let state = AppState::new(test_config(secret), db);
    router(Arc::clone(&state))
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
}

pub fn bearer(secret: &[u8], workspace: Uuid, role: &str) -> String {
    let claims = make_access_claims("test-user", workspace, role, 3600);
    let token = encode_token(&JwtKeys::from_secret(secret), &claims).expect("encode token");
    format!("Bearer {token}")
}

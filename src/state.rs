use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;

use crate::{
    auth::jwt::JwtKeys,
    config::AppConfig,
    engine::cache::{MetadataCache, MokaMetadataCache},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub jwt: JwtKeys,
    pub metadata_cache: Arc<dyn MetadataCache>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Arc<Self> {
        let metadata_cache = Arc::new(MokaMetadataCache::new(
            config.engine.cache_capacity,
            Duration::from_secs(config.engine.cache_ttl_secs),
        ));
        Self::with_cache(config, db, metadata_cache)
    }

    pub fn with_cache(
        config: AppConfig,
        db: DatabaseConnection,
        metadata_cache: Arc<dyn MetadataCache>,
    ) -> Arc<Self> {
        Arc::new(Self {
            jwt: JwtKeys::from_secret(config.auth.jwt_secret.as_bytes()),
            db,
            config,
            metadata_cache,
        })
    }
}

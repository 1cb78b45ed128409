use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::EngineConfig,
    db::{
        catalog::{CatalogReader, PgCatalog, PolicyCatalog},
        dao::DaoContext,
    },
    engine::cache::MetadataCache,
    services::{
        capability_gate::CapabilityGate, data_service::DataService,
        metadata_service::MetadataService, permission_service::PermissionService,
    },
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    db: DatabaseConnection,
    daos: DaoContext,
    engine: EngineConfig,
    cache: Arc<dyn MetadataCache>,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection, engine: EngineConfig, cache: Arc<dyn MetadataCache>) -> Self {
        Self {
            db: db.clone(),
            daos: DaoContext::new(db),
            engine,
            cache,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            &state.db,
            state.config.engine.clone(),
            Arc::clone(&state.metadata_cache),
        )
    }

    pub fn metadata(&self) -> MetadataService {
        let catalog: Arc<dyn CatalogReader> =
            Arc::new(PgCatalog::new(&self.db, self.engine.schema.as_str()));
        MetadataService::new(
            catalog,
            self.daos.clone(),
            Arc::clone(&self.cache),
            self.engine.clone(),
        )
    }

    pub fn data(&self) -> DataService {
        DataService::new(&self.db, self.metadata(), self.engine.clone())
    }

    pub fn permissions(&self) -> PermissionService {
        let catalog: Arc<dyn PolicyCatalog> =
            Arc::new(PgCatalog::new(&self.db, self.engine.schema.as_str()));
        PermissionService::new(catalog, &self.engine)
    }

    pub fn capability_gate(&self) -> CapabilityGate {
        CapabilityGate::new(self.daos.role_permission())
    }
}

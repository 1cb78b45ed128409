use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    config::EngineConfig,
    db::catalog::PolicyCatalog,
    engine::{
        EngineError,
        gaps::{GapAnalysis, MigrationScript, PermissionChange, PermissionMiner, analyze, export},
    },
};

const POLICY_CATALOG: &str = "policy catalog";

#[derive(Clone)]
pub struct PermissionService {
    catalog: Arc<dyn PolicyCatalog>,
    functions: Vec<String>,
    rls_exempt: Vec<String>,
}

impl PermissionService {
    pub fn new(catalog: Arc<dyn PolicyCatalog>, engine: &EngineConfig) -> Self {
        Self {
            catalog,
            functions: engine.permission_functions.clone(),
            rls_exempt: engine.rls_exempt_tables.clone(),
        }
    }

    /// Read-only: nothing is written back to the store.
    pub async fn analyze_gaps(&self) -> Result<GapAnalysis, EngineError> {
        let miner = PermissionMiner::new(&self.functions)
            .map_err(|err| EngineError::validation("permission_functions", err.to_string()))?;

        let (security, seeded, policies) = tokio::try_join!(
            self.catalog.table_security(),
            self.catalog.seeded_permissions(),
            self.catalog.policies(),
        )
        .map_err(|err| EngineError::catalog(POLICY_CATALOG, err))?;

        let referenced = miner.mine(&policies);
        let analysis = analyze(&security, &seeded, &referenced, &self.rls_exempt);

        info!(
            policies = policies.len(),
            missing_permissions = analysis.missing_permissions.len(),
            tables_without_policies = analysis.tables_without_policies.len(),
            tables_without_rls = analysis.tables_without_rls.len(),
            incomplete_crud = analysis.incomplete_crud.len(),
            "permission gap analysis finished"
        );
        Ok(analysis)
    }

    pub fn export_migration(&self, changes: &[PermissionChange]) -> Result<MigrationScript, EngineError> {
        export(changes, Utc::now())
    }
}

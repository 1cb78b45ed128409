use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    db::{
        catalog::CatalogReader,
        dao::{DaoContext, StoredTableConfig},
    },
    engine::{
        EngineError,
        cache::{MetadataCache, MetadataKey},
        identifier::require_identifier,
        metadata::{CatalogSnapshot, TableConfig},
        relationships::RelationshipDetector,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub synced: usize,
    pub total: usize,
    pub results: Vec<SyncResult>,
}

#[derive(Clone)]
pub struct MetadataService {
    catalog: Arc<dyn CatalogReader>,
    daos: DaoContext,
    cache: Arc<dyn MetadataCache>,
    engine: EngineConfig,
}

impl MetadataService {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        daos: DaoContext,
        cache: Arc<dyn MetadataCache>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            daos,
            cache,
            engine,
        }
    }

    /// Introspects one table and replaces its stored snapshot. The companion
    /// page is only ever created, never updated.
    #[tracing::instrument(skip(self))]
    pub async fn sync_table(&self, workspace: Uuid, table: &str) -> Result<TableConfig, EngineError> {
        require_identifier("table", table)?;

        let detector = RelationshipDetector::new(self.catalog.as_ref());
        let tables = [table.to_string()];
        let (columns, forward, reverse, primary_key, mut comments) = tokio::try_join!(
            self.catalog.list_columns(table),
            detector.detect_forward(table),
            detector.detect_reverse(table),
            self.catalog.primary_key(table),
            self.catalog.comments(&tables),
        )
        .map_err(|err| EngineError::catalog(table, err))?;

        if columns.is_empty() {
            return Err(EngineError::NotFound {
                kind: "Table",
                identity: table.to_string(),
            });
        }

        let snapshot = CatalogSnapshot {
            table: table.to_string(),
            columns,
            forward,
            reverse,
            primary_key,
            description: comments.remove(table).flatten(),
        };

        let table_configs = self.daos.table_config();
        let previous = table_configs.find(workspace, table).await?;
        let config = TableConfig::assemble(snapshot, previous.as_ref())?;
        table_configs.upsert(workspace, table, &config).await?;
        // The stored snapshot has changed even if the page insert below fails.
        self.cache.invalidate(&MetadataKey::new(workspace, table));

        let page_created = self.daos.page().create_if_absent(workspace, table).await?;

        info!(
            table,
            fields = config.field_metadata.len(),
            relationships = config.relationships.len(),
            page_created,
            "table synced"
        );
        Ok(config)
    }

    /// Syncs every base table one at a time. A failing table is recorded and
    /// the batch continues.
    #[tracing::instrument(skip(self))]
    pub async fn sync_all(&self, workspace: Uuid) -> Result<SyncReport, EngineError> {
        let tables = self
            .catalog
            .list_tables()
            .await
            .map_err(|err| EngineError::catalog("*", err))?;

        let tables: Vec<String> = tables
            .into_iter()
            .filter(|table| !self.is_internal(table))
            .collect();

        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            match self.sync_table(workspace, &table).await {
                Ok(_) => results.push(SyncResult {
                    name: table,
                    success: true,
                    error: None,
                }),
                Err(err) => {
                    warn!(table = %table, error = %err, "table sync failed");
                    results.push(SyncResult {
                        name: table,
                        success: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let total = results.len();
        let synced = results.iter().filter(|result| result.success).count();
        info!(synced, total, "schema sync finished");
        Ok(SyncReport {
            success: synced == total,
            synced,
            total,
            results,
        })
    }

    pub async fn list_configs(&self, workspace: Uuid) -> Result<Vec<StoredTableConfig>, EngineError> {
        Ok(self.daos.table_config().list(workspace).await?)
    }

    /// Read-through lookup. Absent tables are not cached.
    pub async fn cached_config(
        &self,
        workspace: Uuid,
        table: &str,
    ) -> Result<Option<Arc<TableConfig>>, EngineError> {
        let key = MetadataKey::new(workspace, table);
        if let Some(config) = self.cache.get(&key) {
            return Ok(Some(config));
        }

        let Some(config) = self.daos.table_config().find(workspace, table).await? else {
            return Ok(None);
        };
        let config = Arc::new(config);
        self.cache.insert(key, Arc::clone(&config));
        Ok(Some(config))
    }

    pub async fn table_metadata(
        &self,
        workspace: Uuid,
        table: &str,
    ) -> Result<Arc<TableConfig>, EngineError> {
        require_identifier("table", table)?;
        self.cached_config(workspace, table)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                kind: "Table metadata",
                identity: table.to_string(),
            })
    }

    fn is_internal(&self, table: &str) -> bool {
        self.engine.exclude_internal_tables
            && self.engine.internal_tables.iter().any(|internal| internal == table)
    }
}

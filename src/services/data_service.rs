use std::{collections::HashMap, sync::Arc};

use sea_orm::{DatabaseConnection, FromQueryResult, JsonValue, Statement};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    engine::{
        EngineError,
        identifier::require_identifier,
        metadata::TableConfig,
        query::{
            DataQueryRequest, EnrichmentJoin, PageLimits, Pagination, QueryCompiler,
            plan_enrichment, record_lookup,
        },
    },
    services::metadata_service::MetadataService,
};

const DEFAULT_ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPage {
    pub table_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<JsonValue>,
    pub pagination: Pagination,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

#[derive(Clone)]
pub struct DataService {
    db: DatabaseConnection,
    metadata: MetadataService,
    engine: EngineConfig,
}

impl DataService {
    pub fn new(db: &DatabaseConnection, metadata: MetadataService, engine: EngineConfig) -> Self {
        Self {
            db: db.clone(),
            metadata,
            engine,
        }
    }

    /// Runs a filtered, paginated read. Every parameter is validated before
    /// any statement reaches the store.
    #[tracing::instrument(skip(self, params))]
    pub async fn query(
        &self,
        workspace: Uuid,
        table: &str,
        params: &HashMap<String, String>,
    ) -> Result<DataPage, EngineError> {
        let limits = PageLimits {
            default_limit: self.engine.default_page_limit,
            max_limit: self.engine.max_page_limit,
        };
        let request = DataQueryRequest::from_params(table, params, limits)?;
        let config = self.metadata.cached_config(workspace, table).await?;
        let compiler = QueryCompiler::new(&self.engine.schema, &request, config.as_deref());

        let count = compiler.count()?;
        let plain = compiler.select(&[])?;
        let joins = match &config {
            Some(config) if plain.is_some() => self.enrichment_joins(workspace, config).await,
            _ => Vec::new(),
        };

        let total = CountRow::find_by_statement(count)
            .one(&self.db)
            .await
            .map_err(|err| {
                error!(table, error = %err, "count query failed");
                EngineError::query_failure(table, err)
            })?
            .map(|row| row.total.max(0) as u64)
            .unwrap_or_default();

        let rows = match plain {
            None => Vec::new(),
            Some(plain) => self.fetch_rows(table, &compiler, &joins, plain).await?,
        };

        let columns = rows
            .first()
            .and_then(JsonValue::as_object)
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        Ok(DataPage {
            table_name: request.table.clone(),
            columns,
            rows,
            pagination: Pagination::compute(request.page, request.limit, total),
        })
    }

    /// Looks up one row. Without an explicit `id_column` the synced primary
    /// key is used; tables without a single-column key cannot be addressed
    /// that way.
    pub async fn find_record(
        &self,
        workspace: Uuid,
        table: &str,
        id_column: Option<&str>,
        id: &str,
    ) -> Result<Option<JsonValue>, EngineError> {
        require_identifier("table", table)?;
        let config = self.metadata.cached_config(workspace, table).await?;

        let id_column = match (id_column, config.as_deref()) {
            (Some(column), _) => column.to_string(),
            (None, Some(config)) => config.primary_key_column.clone().ok_or_else(|| {
                EngineError::validation(
                    "idColumn",
                    format!("{table} has no single-column primary key; pass idColumn"),
                )
            })?,
            (None, None) => DEFAULT_ID_COLUMN.to_string(),
        };

        let statement =
            record_lookup(&self.engine.schema, table, &id_column, id, config.as_deref())?;
        JsonValue::find_by_statement(statement)
            .one(&self.db)
            .await
            .map_err(|err| {
                error!(table, error = %err, "record lookup failed");
                EngineError::query_failure(table, err)
            })
    }

    async fn enrichment_joins(&self, workspace: Uuid, config: &TableConfig) -> Vec<EnrichmentJoin> {
        let mut targets: HashMap<String, Arc<TableConfig>> = HashMap::new();
        for relationship in config.forward_relationships() {
            if targets.contains_key(&relationship.target_table) {
                continue;
            }
            match self
                .metadata
                .cached_config(workspace, &relationship.target_table)
                .await
            {
                Ok(Some(target)) => {
                    targets.insert(relationship.target_table.clone(), target);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        related_table = %relationship.target_table,
                        error = %err,
                        "skipping enrichment target"
                    );
                }
            }
        }
        plan_enrichment(config, &targets)
    }

    /// Tries the enriched statement first and falls back to the plain one.
    /// Only a failure of the plain statement is reported.
    async fn fetch_rows(
        &self,
        table: &str,
        compiler: &QueryCompiler<'_>,
        joins: &[EnrichmentJoin],
        plain: Statement,
    ) -> Result<Vec<JsonValue>, EngineError> {
        if !joins.is_empty() {
            match compiler.select(joins) {
                Ok(Some(enriched)) => {
                    match JsonValue::find_by_statement(enriched).all(&self.db).await {
                        Ok(rows) => return Ok(rows),
                        Err(err) => {
                            warn!(table, error = %err, "enriched query failed, retrying without joins");
                        }
                    }
                }
                Ok(None) => return Ok(Vec::new()),
                Err(err) => {
                    warn!(table, error = %err, "enriched query rejected, retrying without joins");
                }
            }
        }

        JsonValue::find_by_statement(plain)
            .all(&self.db)
            .await
            .map_err(|err| {
                error!(table, error = %err, "data query failed");
                EngineError::query_failure(table, err)
            })
    }
}

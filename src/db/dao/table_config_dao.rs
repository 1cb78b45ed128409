use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use serde::Serialize;
use uuid::Uuid;

use super::{DaoLayerError, DaoResult};
use crate::db::entities::table_config;
use crate::engine::metadata::TableConfig;

/// A decoded `table_configs` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTableConfig {
    pub table: String,
    pub config: TableConfig,
}

#[derive(Clone)]
pub struct TableConfigDao {
    db: DatabaseConnection,
}

impl TableConfigDao {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn find(&self, workspace: Uuid, table: &str) -> DaoResult<Option<TableConfig>> {
        let model = table_config::Entity::find_by_id((workspace, table.to_string()))
            .one(&self.db)
            .await?;

        model.map(decode).transpose().map(|row| row.map(|row| row.config))
    }

    pub async fn list(&self, workspace: Uuid) -> DaoResult<Vec<StoredTableConfig>> {
        let models = table_config::Entity::find()
            .filter(table_config::Column::WorkspaceId.eq(workspace))
            .order_by_asc(table_config::Column::TableId)
            .all(&self.db)
            .await?;

        models.into_iter().map(decode).collect()
    }

    /// Replaces the whole document for `(workspace, table)`.
    pub async fn upsert(&self, workspace: Uuid, table: &str, config: &TableConfig) -> DaoResult<()> {
        let document = serde_json::to_value(config).map_err(|source| DaoLayerError::Document {
            entity: "table_config",
            key: table.to_string(),
            source,
        })?;

        let active = table_config::ActiveModel {
            workspace_id: Set(workspace),
            table_id: Set(table.to_string()),
            config: Set(document),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        table_config::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    table_config::Column::WorkspaceId,
                    table_config::Column::TableId,
                ])
                .update_columns([table_config::Column::Config, table_config::Column::UpdatedAt])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

fn decode(model: table_config::Model) -> DaoResult<StoredTableConfig> {
    let config = serde_json::from_value(model.config).map_err(|source| DaoLayerError::Document {
        entity: "table_config",
        key: model.table_id.clone(),
        source,
    })?;
    Ok(StoredTableConfig {
        table: model.table_id,
        config,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use uuid::Uuid;

    use super::TableConfigDao;
    use crate::db::dao::DaoLayerError;
    use crate::db::entities::table_config;

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn stored(workspace: Uuid, table: &str, config: serde_json::Value) -> table_config::Model {
        table_config::Model {
            workspace_id: workspace,
            table_id: table.to_string(),
            config,
            updated_at: ts(),
        }
    }

    fn document() -> serde_json::Value {
        json!({
            "table_type": "base_table",
            "primary_key_column": "id",
            "field_metadata": [{
                "field_name": "id",
                "display_name": "Id",
                "data_type": "integer",
                "is_required": true,
                "is_unique": false
            }],
            "relationships": []
        })
    }

    #[tokio::test]
    async fn find_decodes_stored_document() {
        let workspace = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored(workspace, "orders", document())]])
            .into_connection();
        let dao = TableConfigDao::new(&db);

        let config = dao
            .find(workspace, "orders")
            .await
            .expect("query should succeed")
            .expect("config should exist");
        assert_eq!(config.primary_key_column.as_deref(), Some("id"));
        assert_eq!(config.field_metadata.len(), 1);
    }

    #[tokio::test]
    async fn find_reports_malformed_documents() {
        let workspace = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored(workspace, "orders", json!({ "oops": true }))]])
            .into_connection();
        let dao = TableConfigDao::new(&db);

        let err = dao
            .find(workspace, "orders")
            .await
            .expect_err("decode should fail");
        assert!(matches!(err, DaoLayerError::Document { ref key, .. } if key == "orders"));
    }

    #[tokio::test]
    async fn upsert_updates_on_key_conflict() {
        let workspace = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let dao = TableConfigDao::new(&db);
        let config = serde_json::from_value(document()).expect("document should decode");

        dao.upsert(workspace, "orders", &config)
            .await
            .expect("upsert should succeed");

        let log = db.into_transaction_log();
        let statement = format!("{:?}", log[0]);
        assert!(statement.contains("ON CONFLICT"), "{statement}");
        assert!(statement.contains("DO UPDATE"), "{statement}");
    }
}

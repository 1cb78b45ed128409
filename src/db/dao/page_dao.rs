use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};
use serde_json::json;
use uuid::Uuid;

use super::DaoResult;
use crate::db::entities::page;
use crate::engine::metadata::display_name;

#[derive(Clone)]
pub struct PageDao {
    db: DatabaseConnection,
}

impl PageDao {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    /// Creates the default list-view page for a table. An existing page is
    /// never touched. Returns whether a page was created.
    pub async fn create_if_absent(&self, workspace: Uuid, table: &str) -> DaoResult<bool> {
        let now = Utc::now().fixed_offset();
        let active = page::ActiveModel {
            workspace_id: Set(workspace),
            table_id: Set(table.to_string()),
            id: Set(Uuid::new_v4()),
            title: Set(display_name(table)),
            slug: Set(table.replace('_', "-")),
            blocks: Set(json!([{ "type": "table_view", "table": table }])),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = page::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([page::Column::WorkspaceId, page::Column::TableId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::PageDao;

    #[tokio::test]
    async fn create_if_absent_never_overwrites() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();
        let dao = PageDao::new(&db);
        let workspace = Uuid::new_v4();

        assert!(dao.create_if_absent(workspace, "order_items").await.expect("insert"));
        assert!(!dao.create_if_absent(workspace, "order_items").await.expect("insert"));

        let log = db.into_transaction_log();
        let statement = format!("{:?}", log[0]);
        assert!(statement.contains("DO NOTHING"), "{statement}");
        assert!(statement.contains("Order Items"), "{statement}");
    }
}

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use super::DaoResult;
use crate::db::entities::role_permission;

/// Grants every permission.
pub const WILDCARD: &str = "*";

#[derive(Clone)]
pub struct RolePermissionDao {
    db: DatabaseConnection,
}

impl RolePermissionDao {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    /// True when `role` holds `permission` exactly or holds the wildcard.
    pub async fn has_permission(&self, role: &str, permission: &str) -> DaoResult<bool> {
        let grant = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role))
            .filter(role_permission::Column::Permission.is_in([permission, WILDCARD]))
            .one(&self.db)
            .await?;
        Ok(grant.is_some())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::RolePermissionDao;
    use crate::db::entities::role_permission;

    #[tokio::test]
    async fn grant_found_for_exact_or_wildcard() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![role_permission::Model {
                    role_id: "owner".to_string(),
                    permission: "*".to_string(),
                }],
                Vec::new(),
            ])
            .into_connection();
        let dao = RolePermissionDao::new(&db);

        assert!(dao.has_permission("owner", "data.view").await.expect("query"));
        assert!(!dao.has_permission("viewer", "tables.sync").await.expect("query"));

        let log = db.into_transaction_log();
        let statement = format!("{:?}", log[0]);
        assert!(statement.contains("IN"), "{statement}");
        assert!(statement.contains("data.view"), "{statement}");
    }
}

use sea_orm::DatabaseConnection;

use super::{PageDao, RolePermissionDao, TableConfigDao};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn table_config(&self) -> TableConfigDao {
        TableConfigDao::new(&self.db)
    }

    pub fn page(&self) -> PageDao {
        PageDao::new(&self.db)
    }

    pub fn role_permission(&self) -> RolePermissionDao {
        RolePermissionDao::new(&self.db)
    }
}

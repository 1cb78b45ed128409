mod context;
pub mod error;
pub mod page_dao;
pub mod role_permission_dao;
pub mod table_config_dao;

pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use page_dao::PageDao;
pub use role_permission_dao::RolePermissionDao;
pub use table_config_dao::{StoredTableConfig, TableConfigDao};

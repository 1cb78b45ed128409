pub mod page;
pub mod role_permission;
pub mod table_config;

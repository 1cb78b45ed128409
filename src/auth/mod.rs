pub mod jwt;
mod types;

pub use types::{
    Claims, DataView, PermissionsEdit, PermissionsView, RequiredPermission, TablesSync,
    TablesView, permissions,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission strings checked at the HTTP entry points.
pub mod permissions {
    pub const TABLES_VIEW: &str = "tables.view";
    pub const TABLES_SYNC: &str = "tables.sync";
    pub const DATA_VIEW: &str = "data.view";
    pub const PERMISSIONS_VIEW: &str = "permissions.view";
    pub const PERMISSIONS_EDIT: &str = "permissions.edit";
}

pub trait RequiredPermission {
    fn required() -> &'static str;
}

pub struct TablesView;

impl RequiredPermission for TablesView {
    fn required() -> &'static str {
        permissions::TABLES_VIEW
    }
}

pub struct TablesSync;

impl RequiredPermission for TablesSync {
    fn required() -> &'static str {
        permissions::TABLES_SYNC
    }
}

pub struct DataView;

impl RequiredPermission for DataView {
    fn required() -> &'static str {
        permissions::DATA_VIEW
    }
}

pub struct PermissionsView;

impl RequiredPermission for PermissionsView {
    fn required() -> &'static str {
        permissions::PERMISSIONS_VIEW
    }
}

pub struct PermissionsEdit;

impl RequiredPermission for PermissionsEdit {
    fn required() -> &'static str {
        permissions::PERMISSIONS_EDIT
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub workspace: Uuid, // tenant
    pub role: String,    // role id in role_permissions
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::{
        DataView, PermissionsEdit, PermissionsView, RequiredPermission, TablesSync, TablesView,
    };

    #[test]
    fn permission_markers_map_to_dotted_strings() {
        assert_eq!(TablesView::required(), "tables.view");
        assert_eq!(TablesSync::required(), "tables.sync");
        assert_eq!(DataView::required(), "data.view");
        assert_eq!(PermissionsView::required(), "permissions.view");
        assert_eq!(PermissionsEdit::required(), "permissions.edit");
    }
}

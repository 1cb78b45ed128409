use tracing::info;

use crate::{db::dao::RolePermissionDao, engine::EngineError};

/// Pre-check run before any catalog or data access.
#[derive(Clone)]
pub struct CapabilityGate {
    role_permissions: RolePermissionDao,
}

impl CapabilityGate {
    pub fn new(role_permissions: RolePermissionDao) -> Self {
        Self { role_permissions }
    }

    pub async fn require(&self, role: &str, permission: &str) -> Result<(), EngineError> {
        if self.role_permissions.has_permission(role, permission).await? {
            return Ok(());
        }

        info!(role, permission, "capability denied");
        Err(EngineError::Forbidden {
            permission: permission.to_string(),
        })
    }
}

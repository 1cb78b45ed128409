//! Reviewable SQL for permission-catalog changes. Nothing here is executed.

use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict, PostgresQueryBuilder, Query};
use serde::{Deserialize, Serialize};

use crate::db::entities::role_permission;
use crate::engine::{
    error::{EngineError, FieldError},
    identifier::is_valid_identifier,
};

pub const SOURCE_OF_TRUTH_REMINDER: &str = "Apply the same changes to the seeded role/permission \
     definitions so the next seed run does not revert them.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
    pub role_id: String,
    pub permission: String,
    pub action: ChangeAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationScript {
    pub script: String,
    pub reminder: String,
}

/// `*`, `resource` or `resource.action` where the action may be `*`.
fn is_valid_permission(permission: &str) -> bool {
    if permission == "*" {
        return true;
    }
    match permission.split_once('.') {
        Some((resource, action)) => {
            is_valid_identifier(resource) && (action == "*" || is_valid_identifier(action))
        }
        None => is_valid_identifier(permission),
    }
}

fn validate(changes: &[PermissionChange]) -> Result<(), EngineError> {
    if changes.is_empty() {
        return Err(EngineError::validation("changes", "at least one change is required"));
    }

    let mut fields = Vec::new();
    for (index, change) in changes.iter().enumerate() {
        if !is_valid_identifier(&change.role_id) {
            fields.push(FieldError::new(
                format!("changes[{index}].role_id"),
                format!("'{}' is not a valid role id", change.role_id),
            ));
        }
        if !is_valid_permission(&change.permission) {
            fields.push(FieldError::new(
                format!("changes[{index}].permission"),
                format!("'{}' is not a valid permission string", change.permission),
            ));
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation { fields })
    }
}

pub fn export(
    changes: &[PermissionChange],
    generated_at: DateTime<Utc>,
) -> Result<MigrationScript, EngineError> {
    validate(changes)?;

    let mut lines = vec![
        "-- Role permission changes".to_string(),
        format!(
            "-- Generated at {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        "-- Review before applying. Removals are commented out and must be enabled by hand."
            .to_string(),
        String::new(),
        "BEGIN;".to_string(),
        String::new(),
    ];

    for change in changes {
        match change.action {
            ChangeAction::Add => {
                let insert = Query::insert()
                    .into_table(role_permission::Entity)
                    .columns([
                        role_permission::Column::RoleId,
                        role_permission::Column::Permission,
                    ])
                    .values([change.role_id.as_str().into(), change.permission.as_str().into()])
                    .map_err(|err| EngineError::validation("changes", err.to_string()))?
                    .on_conflict(OnConflict::new().do_nothing().to_owned())
                    .to_string(PostgresQueryBuilder);
                lines.push(format!("{insert};"));
            }
            ChangeAction::Remove => {
                let delete = Query::delete()
                    .from_table(role_permission::Entity)
                    .and_where(Expr::col(role_permission::Column::RoleId).eq(change.role_id.as_str()))
                    .and_where(
                        Expr::col(role_permission::Column::Permission)
                            .eq(change.permission.as_str()),
                    )
                    .to_string(PostgresQueryBuilder);
                lines.push(format!("-- {delete};"));
            }
        }
    }

    lines.push(String::new());
    lines.push("COMMIT;".to_string());
    lines.push(String::new());

    Ok(MigrationScript {
        script: lines.join("\n"),
        reminder: SOURCE_OF_TRUTH_REMINDER.to_string(),
    })
}

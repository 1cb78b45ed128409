//! Read-only access to the store's system catalogs.
//!
//! [`CatalogReader`] covers table structure (columns, keys, comments,
//! foreign keys); [`PolicyCatalog`] covers row-level security state and the
//! seeded permission catalog. [`PgCatalog`] implements both over Postgres.

mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

pub use postgres::PgCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub is_unique: bool,
}

/// Which side of a foreign key the inspected table sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeySide {
    /// The table owns the FK column.
    Referencing,
    /// The table is the one being pointed at.
    Referenced,
}

/// One column pair of a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSecurity {
    pub table: String,
    pub rls_enabled: bool,
    pub policy_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededPermission {
    pub role_id: String,
    pub permission: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

impl PolicyCommand {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SELECT" | "R" => Self::Select,
            "INSERT" | "A" => Self::Insert,
            "UPDATE" | "W" => Self::Update,
            "DELETE" | "D" => Self::Delete,
            _ => Self::All,
        }
    }
}

/// One row-level-security policy. Predicates are kept as opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub permissive: bool,
    pub roles: Vec<String>,
    pub command: PolicyCommand,
    pub using_expr: Option<String>,
    pub with_check_expr: Option<String>,
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Base tables of the configured schema, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>, DbErr>;

    /// Columns in physical order.
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbErr>;

    /// The column behind a single-column primary key; `None` for no key or a
    /// composite key.
    async fn primary_key(&self, table: &str) -> Result<Option<String>, DbErr>;

    async fn comments(&self, tables: &[String]) -> Result<HashMap<String, Option<String>>, DbErr>;

    async fn foreign_keys(
        &self,
        table: &str,
        side: ForeignKeySide,
    ) -> Result<Vec<ForeignKeyRow>, DbErr>;
}

#[async_trait]
pub trait PolicyCatalog: Send + Sync {
    async fn table_security(&self) -> Result<Vec<TableSecurity>, DbErr>;

    async fn seeded_permissions(&self) -> Result<Vec<SeededPermission>, DbErr>;

    async fn policies(&self) -> Result<Vec<PolicyRecord>, DbErr>;
}

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DbBackend, DbErr, EntityTrait, FromQueryResult, QueryOrder, Statement,
    Value,
};

use super::{
    CatalogReader, ColumnInfo, ForeignKeyRow, ForeignKeySide, PolicyCatalog, PolicyCommand,
    PolicyRecord, SeededPermission, TableSecurity,
};
use crate::db::entities::role_permission;

// information_schema exposes domain types (sql_identifier, yes_or_no) that the
// driver will not decode as text, so every name column is cast explicitly.

const LIST_TABLES_SQL: &str = "SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name";

const LIST_COLUMNS_SQL: &str = "SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.is_nullable::text AS is_nullable,
        c.column_default::text AS column_default,
        EXISTS (
            SELECT 1
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'UNIQUE'
              AND tc.table_schema = c.table_schema
              AND tc.table_name = c.table_name
              AND kcu.column_name = c.column_name
        ) AS is_unique
    FROM information_schema.columns c
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position";

const PRIMARY_KEY_SQL: &str = "SELECT kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
    ORDER BY kcu.ordinal_position";

const TABLE_COMMENTS_SQL: &str = "SELECT
        c.relname::text AS table_name,
        obj_description(c.oid, 'pg_class') AS description
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
    ORDER BY c.relname";

const FOREIGN_KEYS_SQL: &str = "SELECT
        con.conname::text AS constraint_name,
        src.relname::text AS source_table,
        sa.attname::text AS source_column,
        tgt.relname::text AS target_table,
        ta.attname::text AS target_column
    FROM pg_constraint con
    JOIN pg_class src ON src.oid = con.conrelid
    JOIN pg_class tgt ON tgt.oid = con.confrelid
    JOIN pg_namespace n ON n.oid = con.connamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) AS k(src_attnum, tgt_attnum)
    JOIN pg_attribute sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum
    JOIN pg_attribute ta ON ta.attrelid = con.confrelid AND ta.attnum = k.tgt_attnum
    WHERE con.contype = 'f' AND n.nspname = $1";

const TABLE_SECURITY_SQL: &str = "SELECT
        c.relname::text AS table_name,
        c.relrowsecurity AS rls_enabled,
        (
            SELECT COUNT(*)
            FROM pg_policies p
            WHERE p.schemaname = n.nspname AND p.tablename = c.relname
        ) AS policy_count
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
    ORDER BY c.relname";

const POLICIES_SQL: &str = "SELECT
        schemaname::text AS schema_name,
        tablename::text AS table_name,
        policyname::text AS policy_name,
        permissive::text AS permissive,
        array_to_string(roles, ',') AS roles,
        cmd::text AS command,
        qual::text AS using_expr,
        with_check::text AS with_check_expr
    FROM pg_policies
    WHERE schemaname = $1
    ORDER BY tablename, policyname";

#[derive(Debug, FromQueryResult)]
struct TableNameRow {
    table_name: String,
}

#[derive(Debug, FromQueryResult)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    column_default: Option<String>,
    is_unique: bool,
}

#[derive(Debug, FromQueryResult)]
struct KeyColumnRow {
    column_name: String,
}

#[derive(Debug, FromQueryResult)]
struct CommentRow {
    table_name: String,
    description: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct ForeignKeyQueryRow {
    constraint_name: String,
    source_table: String,
    source_column: String,
    target_table: String,
    target_column: String,
}

#[derive(Debug, FromQueryResult)]
struct TableSecurityRow {
    table_name: String,
    rls_enabled: bool,
    policy_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct PolicyRow {
    schema_name: String,
    table_name: String,
    policy_name: String,
    permissive: String,
    roles: Option<String>,
    command: String,
    using_expr: Option<String>,
    with_check_expr: Option<String>,
}

/// Catalog access for one Postgres schema over the shared connection pool.
#[derive(Clone)]
pub struct PgCatalog {
    db: DatabaseConnection,
    schema: String,
}

impl PgCatalog {
    pub fn new(db: &DatabaseConnection, schema: impl Into<String>) -> Self {
        Self {
            db: db.clone(),
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn statement(&self, sql: &str, extra: impl IntoIterator<Item = Value>) -> Statement {
        let mut values: Vec<Value> = vec![self.schema.as_str().into()];
        values.extend(extra);
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }
}

#[async_trait]
impl CatalogReader for PgCatalog {
    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    async fn list_tables(&self) -> Result<Vec<String>, DbErr> {
        let rows = TableNameRow::find_by_statement(self.statement(LIST_TABLES_SQL, []))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| row.table_name).collect())
    }

    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbErr> {
        let rows = ColumnRow::find_by_statement(self.statement(LIST_COLUMNS_SQL, [table.into()]))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnInfo {
                name: row.column_name,
                data_type: row.data_type,
                is_nullable: row.is_nullable.eq_ignore_ascii_case("YES"),
                default_value: row.column_default,
                is_unique: row.is_unique,
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    async fn primary_key(&self, table: &str) -> Result<Option<String>, DbErr> {
        let mut rows =
            KeyColumnRow::find_by_statement(self.statement(PRIMARY_KEY_SQL, [table.into()]))
                .all(&self.db)
                .await?;

        // Composite keys cannot address a single row by one column.
        if rows.len() != 1 {
            return Ok(None);
        }
        Ok(rows.pop().map(|row| row.column_name))
    }

    async fn comments(&self, tables: &[String]) -> Result<HashMap<String, Option<String>>, DbErr> {
        let rows = CommentRow::find_by_statement(self.statement(TABLE_COMMENTS_SQL, []))
            .all(&self.db)
            .await?;

        let mut comments: HashMap<String, Option<String>> =
            tables.iter().map(|table| (table.clone(), None)).collect();
        for row in rows {
            if let Some(slot) = comments.get_mut(&row.table_name) {
                *slot = row.description;
            }
        }
        Ok(comments)
    }

    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    async fn foreign_keys(
        &self,
        table: &str,
        side: ForeignKeySide,
    ) -> Result<Vec<ForeignKeyRow>, DbErr> {
        let filter = match side {
            ForeignKeySide::Referencing => " AND src.relname = $2",
            ForeignKeySide::Referenced => " AND tgt.relname = $2",
        };
        let sql = format!("{FOREIGN_KEYS_SQL}{filter} ORDER BY src.relname, sa.attname, con.conname");

        let rows = ForeignKeyQueryRow::find_by_statement(self.statement(&sql, [table.into()]))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKeyRow {
                constraint_name: row.constraint_name,
                source_table: row.source_table,
                source_column: row.source_column,
                target_table: row.target_table,
                target_column: row.target_column,
            })
            .collect())
    }
}

#[async_trait]
impl PolicyCatalog for PgCatalog {
    async fn table_security(&self) -> Result<Vec<TableSecurity>, DbErr> {
        let rows = TableSecurityRow::find_by_statement(self.statement(TABLE_SECURITY_SQL, []))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TableSecurity {
                table: row.table_name,
                rls_enabled: row.rls_enabled,
                policy_count: row.policy_count,
            })
            .collect())
    }

    async fn seeded_permissions(&self) -> Result<Vec<SeededPermission>, DbErr> {
        let rows = role_permission::Entity::find()
            .order_by_asc(role_permission::Column::RoleId)
            .order_by_asc(role_permission::Column::Permission)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SeededPermission {
                role_id: row.role_id,
                permission: row.permission,
            })
            .collect())
    }

    async fn policies(&self) -> Result<Vec<PolicyRecord>, DbErr> {
        let rows = PolicyRow::find_by_statement(self.statement(POLICIES_SQL, []))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PolicyRecord {
                schema: row.schema_name,
                table: row.table_name,
                name: row.policy_name,
                permissive: row.permissive.eq_ignore_ascii_case("PERMISSIVE"),
                roles: row
                    .roles
                    .map(|roles| {
                        roles
                            .split(',')
                            .filter(|role| !role.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                command: PolicyCommand::parse(&row.command),
                using_expr: row.using_expr,
                with_check_expr: row.with_check_expr,
            })
            .collect())
    }
}

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_MIN_IDLE: u32 = 2;
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JWT_SECRET: &str = "super-secret-change-me";

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_MAX_PAGE_LIMIT: u64 = 1000;
pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Product-state tables that live next to tenant tables in the same schema.
pub const DEFAULT_INTERNAL_TABLES: &[&str] = &[
    "table_configs",
    "pages",
    "role_permissions",
    "seaql_migrations",
];

/// Tables that legitimately run without row-level security.
pub const DEFAULT_RLS_EXEMPT_TABLES: &[&str] =
    &["seaql_migrations", "schema_migrations", "spatial_ref_sys"];

pub const DEFAULT_PERMISSION_FUNCTIONS: &[&str] = &["has_permission", "authorize"];

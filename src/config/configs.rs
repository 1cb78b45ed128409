use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{defaults, validate};

const ENV_PREFIX: &str = "APP";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Reads `APP__SECTION__KEY` variables (after loading `.env`) and validates the result.
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        let settings = config_rs::Config::builder()
            .add_source(
                config_rs::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .list_separator(",")
                    .with_list_parse_key("engine.internal_tables")
                    .with_list_parse_key("engine.rls_exempt_tables")
                    .with_list_parse_key("engine.permission_functions")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read environment variables for config")?;

        let cfg = settings
            .try_deserialize::<Self>()
            .context("failed to deserialize environment into config")?;

        validate::validate(&cfg)?;
        Ok(cfg)
    }

    pub fn database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .context("database config is required (set APP__DATABASE__URL)")
    }
}

fn load_dotenv() {
    // Crate-root .env first, then whatever the working directory provides.
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let _ = dotenvy::from_filename(manifest_dir.join(".env")).or_else(|_| dotenvy::dotenv());
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: defaults::DEFAULT_JWT_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub schema: String,
    pub max_page_limit: u64,
    pub default_page_limit: u64,
    pub exclude_internal_tables: bool,
    pub internal_tables: Vec<String>,
    pub rls_exempt_tables: Vec<String>,
    pub permission_functions: Vec<String>,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema: defaults::DEFAULT_SCHEMA.to_string(),
            max_page_limit: defaults::DEFAULT_MAX_PAGE_LIMIT,
            default_page_limit: defaults::DEFAULT_PAGE_LIMIT,
            exclude_internal_tables: true,
            internal_tables: to_owned_list(defaults::DEFAULT_INTERNAL_TABLES),
            rls_exempt_tables: to_owned_list(defaults::DEFAULT_RLS_EXEMPT_TABLES),
            permission_functions: to_owned_list(defaults::DEFAULT_PERMISSION_FUNCTIONS),
            cache_capacity: defaults::DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: defaults::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE
}

fn default_statement_timeout_secs() -> u64 {
    defaults::DEFAULT_STATEMENT_TIMEOUT_SECS
}

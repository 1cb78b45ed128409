use anyhow::{Result, bail};

use super::AppConfig;
use crate::engine::identifier::is_valid_identifier;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let errors = collect_errors(cfg);
    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}

fn collect_errors(cfg: &AppConfig) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    if cfg.auth.jwt_secret.trim().is_empty() {
        errors.push("auth.jwt_secret must not be empty".to_string());
    }

    let engine = &cfg.engine;
    if !is_valid_identifier(&engine.schema) {
        errors.push(format!(
            "engine.schema ({}) must match [a-zA-Z0-9_]+",
            engine.schema
        ));
    }

    if engine.default_page_limit == 0 || engine.default_page_limit > engine.max_page_limit {
        errors.push(format!(
            "engine.default_page_limit ({}) must be in 1..=engine.max_page_limit ({})",
            engine.default_page_limit, engine.max_page_limit
        ));
    }

    if engine.permission_functions.is_empty() {
        errors.push("engine.permission_functions must name at least one function".to_string());
    }

    for name in &engine.permission_functions {
        if !is_valid_identifier(name) {
            errors.push(format!(
                "engine.permission_functions entry '{name}' must match [a-zA-Z0-9_]+"
            ));
        }
    }

    if engine.cache_capacity == 0 {
        errors.push("engine.cache_capacity must be > 0".to_string());
    }

    errors
}

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseConfig;

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let statement_timeout = format!("{}s", cfg.statement_timeout_secs);
    let mut options = ConnectOptions::new(cfg.url.clone());
    options
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_idle)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false)
        .map_sqlx_postgres_opts(move |opts| {
            opts.options([("statement_timeout", statement_timeout.as_str())])
        });

    let db = Database::connect(options).await?;
    info!("syncing product-state tables from entities");
    db.get_schema_registry("data_engine::db::entities::*")
        .sync(&db)
        .await?;
    Ok(db)
}

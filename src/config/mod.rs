pub mod configs;
pub mod defaults;
pub mod validate;

pub use configs::{AppConfig, AuthConfig, DatabaseConfig, EngineConfig, GeneralConfig, LoggingConfig};

use sea_orm::DbErr;
use serde::Serialize;

use crate::db::dao::DaoLayerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Approximate, user-facing reason a compiled statement failed at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailureCause {
    UnknownColumn,
    MissingTable,
    PermissionDenied,
    Timeout,
    Generic,
}

impl QueryFailureCause {
    /// Classifies a driver error by its message. Postgres reports
    /// `column "x" does not exist`, `relation "t" does not exist`,
    /// `permission denied for table t` and
    /// `canceling statement due to statement timeout`.
    pub fn classify(err: &DbErr) -> Self {
        let message = err.to_string().to_ascii_lowercase();
        if message.contains("column") && message.contains("does not exist") {
            Self::UnknownColumn
        } else if message.contains("relation") && message.contains("does not exist") {
            Self::MissingTable
        } else if message.contains("permission denied") {
            Self::PermissionDenied
        } else if message.contains("timeout") || message.contains("timed out") {
            Self::Timeout
        } else {
            Self::Generic
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::UnknownColumn => "a referenced column does not exist",
            Self::MissingTable => "the table does not exist",
            Self::PermissionDenied => "the store denied access to the table",
            Self::Timeout => "the query timed out",
            Self::Generic => "the query could not be executed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Missing required permission: {permission}")]
    Forbidden { permission: String },

    #[error("{kind} not found: {identity}")]
    NotFound { kind: &'static str, identity: String },

    #[error("Validation failed: {}", summarize(.fields))]
    Validation { fields: Vec<FieldError> },

    #[error("Catalog unavailable for {table}: {source}")]
    CatalogUnavailable {
        table: String,
        #[source]
        source: DbErr,
    },

    #[error("Query on {table} failed: {}", .cause.describe())]
    QueryFailure {
        table: String,
        cause: QueryFailureCause,
        #[source]
        source: DbErr,
    },

    #[error(transparent)]
    Store(#[from] DaoLayerError),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![FieldError::new(field, message)],
        }
    }

    pub fn catalog(table: impl Into<String>, source: DbErr) -> Self {
        Self::CatalogUnavailable {
            table: table.into(),
            source,
        }
    }

    pub fn query_failure(table: impl Into<String>, source: DbErr) -> Self {
        Self::QueryFailure {
            table: table.into(),
            cause: QueryFailureCause::classify(&source),
            source,
        }
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|field| format!("{}: {}", field.field, field.message))
        .collect::<Vec<_>>()
        .join("; ")
}

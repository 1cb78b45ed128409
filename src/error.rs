use crate::engine::{EngineError, FieldError, QueryFailureCause};

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    QueryFailed {
        message: String,
        cause: QueryFailureCause,
    },
    Unavailable(String),
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Unavailable(message)
            | Self::Internal(message) => message.as_str(),
            Self::Validation { message, .. } | Self::QueryFailed { message, .. } => {
                message.as_str()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Forbidden { .. } => AppError::forbidden(message),
            EngineError::NotFound { .. } => AppError::not_found(message),
            EngineError::Validation { fields } => AppError::Validation { message, fields },
            EngineError::CatalogUnavailable { .. } => AppError::unavailable(message),
            EngineError::QueryFailure { cause, .. } => AppError::QueryFailed { message, cause },
            EngineError::Store(_) => AppError::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use super::AppError;
    use crate::engine::{EngineError, QueryFailureCause};

    #[test]
    fn engine_errors_keep_their_kind() {
        let err = AppError::from(EngineError::Forbidden {
            permission: "tables.sync".to_string(),
        });
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(err.message(), "Missing required permission: tables.sync");

        let err = AppError::from(EngineError::validation("table", "bad"));
        assert!(matches!(err, AppError::Validation { ref fields, .. } if fields.len() == 1));

        let err = AppError::from(EngineError::query_failure(
            "orders",
            DbErr::Custom(r#"column "nme" does not exist"#.to_string()),
        ));
        assert!(matches!(
            err,
            AppError::QueryFailed {
                cause: QueryFailureCause::UnknownColumn,
                ..
            }
        ));
        assert!(!err.message().contains("nme"));
    }
}

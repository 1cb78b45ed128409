//! Identifier grammar shared by every statement the engine generates.
//!
//! Table and column names are the only text ever embedded in generated SQL,
//! and only after passing [`is_valid_identifier`]. Nothing is escaped: a name
//! outside `[a-zA-Z0-9_]+` is rejected.

use super::error::{EngineError, FieldError};

pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

pub fn check_identifier(field: &str, name: &str) -> Result<(), FieldError> {
    if is_valid_identifier(name) {
        return Ok(());
    }
    Err(FieldError::new(
        field,
        format!("'{name}' is not a valid identifier (expected [a-zA-Z0-9_]+)"),
    ))
}

pub fn require_identifier(field: &str, name: &str) -> Result<(), EngineError> {
    check_identifier(field, name).map_err(|err| EngineError::Validation { fields: vec![err] })
}

#[cfg(test)]
mod tests {
    use super::{is_valid_identifier, require_identifier};
    use crate::engine::error::EngineError;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["orders", "order_items", "Orders2", "_hidden", "42"] {
            assert!(is_valid_identifier(name), "{name} should be accepted");
        }
    }

    #[test]
    fn rejects_anything_outside_the_grammar() {
        for name in [
            "",
            "orders;",
            "orders --",
            "\"orders\"",
            "public.orders",
            "order items",
            "ordérs",
            "a'b",
            "name)",
            "x\n",
        ] {
            assert!(!is_valid_identifier(name), "{name:?} should be rejected");
        }
    }

    #[test]
    fn rejection_names_the_offending_field() {
        let err = require_identifier("filter[na me]", "na me").expect_err("should reject");
        match err {
            EngineError::Validation { fields } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "filter[na me]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

pub mod cache;
pub mod error;
pub mod gaps;
pub mod identifier;
pub mod metadata;
pub mod query;
pub mod relationships;

pub use error::{EngineError, FieldError, QueryFailureCause};

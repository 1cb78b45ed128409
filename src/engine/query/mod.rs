//! The dynamic query compiler: request parsing, pagination and statement
//! generation over a table's metadata.

pub mod compiler;
pub mod filter;
pub mod pagination;
pub mod request;

pub use compiler::{EnrichmentJoin, QueryCompiler, plan_enrichment, record_lookup};
pub use filter::{FilterDescriptor, FilterOperator};
pub use pagination::Pagination;
pub use request::{DataQueryRequest, PageLimits, SortOrder};

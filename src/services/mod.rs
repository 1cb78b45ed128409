pub mod capability_gate;
pub mod context;
pub mod data_service;
pub mod metadata_service;
pub mod permission_service;

pub use capability_gate::CapabilityGate;
pub use context::ServiceContext;
pub use data_service::{DataPage, DataService};
pub use metadata_service::{MetadataService, SyncReport, SyncResult};
pub use permission_service::PermissionService;

pub use crate::db::dao::StoredTableConfig;

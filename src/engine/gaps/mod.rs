//! Policy gap analysis: RLS state and policy predicates cross-checked against
//! the seeded permission catalog, plus reviewable remediation scripts.

pub mod analysis;
pub mod migration;
pub mod mining;

pub use analysis::{GapAnalysis, IncompleteCrud, MissingPermission, analyze};
pub use migration::{ChangeAction, MigrationScript, PermissionChange, export};
pub use mining::{PermissionMiner, PolicyReference};

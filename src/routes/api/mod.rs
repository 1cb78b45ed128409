pub mod data;
pub mod permissions;
pub mod public;
mod router;
pub mod tables;

pub use router::router;

//! LIF Core Types
//!
//! This crate contains pure types with no I/O: resource identifiers
//! and the error taxonomy shared by every compile phase.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{ResourceId, ResourceKind};

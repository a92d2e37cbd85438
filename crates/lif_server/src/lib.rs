//! LIF Server
//!
//! HTTP transport for compiling and deploying declaration documents.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;

pub use api::{ApiServer, AppState, ServerConfig, StatusResponse, router};
pub use error::{ApiError, ErrorBody};

//! LIF Runtime
//!
//! Execution shell around an external container-orchestration CLI.
//! Writes a compiled manifest to disk, tears down what a previous run
//! left behind, and starts the services.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deploy;
pub mod error;
pub mod orchestrator;

pub use deploy::{DeployReport, Deployer};
pub use error::RuntimeError;
pub use orchestrator::{DockerCompose, Orchestrator};

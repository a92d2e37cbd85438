//! LIF Planner
//!
//! Compiles a declared resource graph with symbolic references into a
//! fully-resolved, health-gated compose manifest.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod config;
pub mod credential;
pub mod dag;
pub mod declare;
pub mod graph;
pub mod manifest;
pub mod resolve;

pub use compiler::{CompileContext, Compilation, Compiler, compile_to_yaml};
pub use config::{CompileConfig, ConfigError, DataStoreConfig, HealthcheckConfig};
pub use credential::{CredentialGenerator, CredentialSet, CredentialStore};
pub use dag::{DependencyCondition, DependencyEdge, DependencyOrderer, SynthesisOrder};
pub use declare::{ComputeUnit, ComputeUnitDeclaration, Infrastructure, PostgresExposes};
pub use graph::{ComputeUnitSpec, ResourceDeclaration, ResourceGraph, ResourceSpec};
pub use manifest::{BuildDirective, DependsOn, Healthcheck, Manifest, ManifestService, Synthesizer};
pub use resolve::{Reference, Resolver};

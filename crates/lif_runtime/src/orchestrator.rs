//! Orchestration CLI adapters.

use crate::error::RuntimeError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// A container-orchestration runtime that runs manifests
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Runtime name, for logs
    fn name(&self) -> &str;

    /// Stop and remove the services of a manifest
    async fn down(&self, manifest: &Path) -> Result<(), RuntimeError>;

    /// Build and start the services of a manifest
    async fn up(&self, manifest: &Path, detach: bool) -> Result<(), RuntimeError>;
}

/// `docker compose` CLI
#[derive(Debug, Clone)]
pub struct DockerCompose {
    program: String,
    subcommand: Vec<String>,
}

impl DockerCompose {
    /// Use `docker compose` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
            subcommand: vec!["compose".to_string()],
        }
    }

    /// Use another executable, e.g. `docker-compose` or `podman`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>, subcommand: Vec<String>) -> Self {
        self.program = program.into();
        self.subcommand = subcommand;
        self
    }

    /// Arguments for an action against a manifest
    #[must_use]
    pub fn args(&self, manifest: &Path, action: &[&str]) -> Vec<String> {
        let mut args = self.subcommand.clone();
        args.push("-f".to_string());
        args.push(manifest.display().to_string());
        args.extend(action.iter().map(ToString::to_string));
        args
    }

    async fn run(&self, manifest: &Path, action: &[&str], inherit_output: bool) -> Result<(), RuntimeError> {
        let args = self.args(manifest, action);
        let command_line = format!("{} {}", self.program, args.join(" "));
        tracing::debug!(command = %command_line, "running orchestrator");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).stdin(Stdio::null());
        if inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd.status().await.map_err(|source| RuntimeError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: command_line,
                status: status.to_string(),
            })
        }
    }
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Orchestrator for DockerCompose {
    fn name(&self) -> &str {
        &self.program
    }

    async fn down(&self, manifest: &Path) -> Result<(), RuntimeError> {
        self.run(manifest, &["down"], false).await
    }

    async fn up(&self, manifest: &Path, detach: bool) -> Result<(), RuntimeError> {
        let action: &[&str] = if detach { &["up", "-d"] } else { &["up"] };
        self.run(manifest, action, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let compose = DockerCompose::new();
        let args = compose.args(Path::new("/tmp/lif.yml"), &["up", "-d"]);
        assert_eq!(args, vec!["compose", "-f", "/tmp/lif.yml", "up", "-d"]);
    }

    #[test]
    fn test_with_program() {
        let compose = DockerCompose::new().with_program("docker-compose", Vec::new());
        assert_eq!(compose.name(), "docker-compose");
        let args = compose.args(Path::new("/m.yml"), &["down"]);
        assert_eq!(args, vec!["-f", "/m.yml", "down"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let compose =
            DockerCompose::new().with_program("lif-no-such-orchestrator", Vec::new());
        let err = compose.down(Path::new("/m.yml")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let compose = DockerCompose::new().with_program("false", Vec::new());
        let err = compose.down(Path::new("/m.yml")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::CommandFailed { .. }));
    }
}

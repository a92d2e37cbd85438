//! Manifest deployment.
//!
//! Teardown failures are expected when nothing is running yet and are only
//! logged. Startup failures abort the deploy.

use crate::error::RuntimeError;
use crate::orchestrator::Orchestrator;
use lif_plan::Manifest;
use std::io::Write;
use std::sync::Arc;

/// Outcome of a successful deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// The manifest that was started
    pub manifest_yaml: String,
    /// Teardown failure that was recovered from
    pub teardown_warning: Option<String>,
}

/// Deploys manifests through an orchestrator
#[derive(Clone)]
pub struct Deployer {
    orchestrator: Arc<dyn Orchestrator>,
    detach: bool,
}

impl Deployer {
    /// Create a deployer that runs services detached
    #[must_use]
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            orchestrator,
            detach: true,
        }
    }

    /// Set whether startup returns once services are running
    #[must_use]
    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    /// Write the manifest to a temporary file, tear down, then start
    ///
    /// # Errors
    ///
    /// Returns error if the manifest cannot be written or startup fails
    pub async fn deploy(&self, manifest: &Manifest) -> Result<DeployReport, RuntimeError> {
        let manifest_yaml = manifest.to_yaml()?;

        let mut file = tempfile::Builder::new()
            .prefix("lif-compose-")
            .suffix(".yml")
            .tempfile()?;
        file.write_all(manifest_yaml.as_bytes())?;
        file.flush()?;
        let path = file.path();

        let orchestrator = self.orchestrator.name().to_string();
        tracing::info!(
            %orchestrator,
            services = manifest.services.len(),
            manifest = %path.display(),
            "deploying manifest"
        );

        let teardown_warning = match self.orchestrator.down(path).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(%orchestrator, error = %err, "teardown failed, continuing");
                Some(err.to_string())
            }
        };

        self.orchestrator
            .up(path, self.detach)
            .await
            .map_err(|err| RuntimeError::StartupFailed {
                reason: err.to_string(),
            })?;
        tracing::info!(%orchestrator, "services started");

        Ok(DeployReport {
            manifest_yaml,
            teardown_warning,
        })
    }
}

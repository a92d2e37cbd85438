//! Compose manifest synthesis.
//!
//! Each resource becomes one service. Data stores get an image, their
//! generated credentials and a health check; compute units get a build
//! directive, their resolved environment and health-gated `depends_on`.

use crate::config::CompileConfig;
use crate::credential::{CredentialSet, DATA_STORE_PORT};
use crate::dag::{DependencyCondition, DependencyEdge};
use crate::graph::{ComputeUnitSpec, check_dockerfile, check_port};
use crate::resolve::Resolver;
use indexmap::IndexMap;
use lif_core::{CoreError, CoreResult, ResourceId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A compose manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Compose file format version
    pub version: String,
    /// Services by resource id, in synthesis order
    pub services: IndexMap<String, ManifestService>,
}

impl Manifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            services: IndexMap::new(),
        }
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> CoreResult<String> {
        serde_yaml::to_string(self).map_err(|e| CoreError::Serialize {
            message: e.to_string(),
        })
    }

    /// Parse from YAML
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a manifest
    pub fn from_yaml(text: &str) -> CoreResult<Self> {
        serde_yaml::from_str(text).map_err(|e| CoreError::MalformedInput {
            reason: e.to_string(),
        })
    }

    /// Get a service by id
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&ManifestService> {
        self.services.get(id)
    }
}

/// One compose service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestService {
    /// Base image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDirective>,
    /// Environment block
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    /// Published `host:container` ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Health check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    /// Startup dependencies by producer id
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub depends_on: IndexMap<String, DependsOn>,
}

/// Build context and Dockerfile name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDirective {
    /// Directory holding the Dockerfile
    pub context: String,
    /// Dockerfile name inside the context
    pub dockerfile: String,
}

impl BuildDirective {
    /// Split an absolute Dockerfile path into context and file name
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedResource`] if the path is not absolute
    /// or does not name a file
    pub fn from_path(id: &str, path: &str) -> CoreResult<Self> {
        check_dockerfile(id, path)?;
        let p = Path::new(path);
        let context = p.parent().and_then(Path::to_str);
        let dockerfile = p.file_name().and_then(|n| n.to_str());
        match (context, dockerfile) {
            (Some(context), Some(dockerfile)) => Ok(Self {
                context: context.to_string(),
                dockerfile: dockerfile.to_string(),
            }),
            _ => Err(CoreError::malformed(
                id,
                "dockerfile",
                format!("{path:?} cannot be split into context and file"),
            )),
        }
    }
}

/// Container health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    /// Check command
    pub test: Vec<String>,
    /// Time between checks
    pub interval: String,
    /// Time before a check fails
    pub timeout: String,
    /// Failures before unhealthy
    pub retries: u32,
}

/// Condition attached to a `depends_on` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Producer state to wait for
    pub condition: DependencyCondition,
}

/// Builds services from resolved resources
pub struct Synthesizer<'c> {
    config: &'c CompileConfig,
}

impl<'c> Synthesizer<'c> {
    /// Create a synthesizer
    #[must_use]
    pub fn new(config: &'c CompileConfig) -> Self {
        Self { config }
    }

    /// Service for a data store
    ///
    /// `index` is the position among data stores and selects the host port.
    ///
    /// # Errors
    ///
    /// Returns error if no host port is left for this data store
    pub fn data_store(
        &self,
        id: &ResourceId,
        credentials: &CredentialSet,
        index: usize,
    ) -> CoreResult<ManifestService> {
        let settings = &self.config.data_store;
        let host_port = u16::try_from(index)
            .ok()
            .and_then(|i| settings.host_port_base.checked_add(i))
            .ok_or_else(|| CoreError::malformed(id.as_str(), "ports", "no host port left to publish on"))?;

        let mut environment = IndexMap::new();
        environment.insert("POSTGRES_USER".to_string(), credentials.user().to_string());
        environment.insert(
            "POSTGRES_PASSWORD".to_string(),
            credentials.password().to_string(),
        );
        environment.insert("POSTGRES_DB".to_string(), id.to_string());

        let check = &settings.healthcheck;
        Ok(ManifestService {
            image: Some(settings.image.clone()),
            environment,
            ports: vec![format!("{host_port}:{DATA_STORE_PORT}")],
            healthcheck: Some(Healthcheck {
                test: vec![
                    "CMD-SHELL".to_string(),
                    format!("psql -U {} -d {} -c 'SELECT 1;'", credentials.user(), id),
                ],
                interval: format!("{}s", check.interval_secs),
                timeout: format!("{}s", check.timeout_secs),
                retries: check.retries,
            }),
            ..ManifestService::default()
        })
    }

    /// Service for a compute unit
    ///
    /// Every field is resolved; resolution errors carry the resource id and
    /// field path.
    ///
    /// # Errors
    ///
    /// Returns error if any field fails to resolve or has the wrong shape
    pub fn compute_unit(
        &self,
        id: &ResourceId,
        spec: &ComputeUnitSpec,
        resolver: &Resolver<'_>,
        edges: &[DependencyEdge],
    ) -> CoreResult<ManifestService> {
        let resolve = |field: String, token: &str| {
            resolver
                .resolve(token)
                .map_err(|e| e.in_field(id.as_str(), field))
        };

        let ports = spec
            .ports
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let field = format!("ports[{i}]");
                let port = resolve(field.clone(), token)?;
                check_port(id.as_str(), &field, &port)?;
                Ok(format!("{port}:{port}"))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let environment = spec
            .env_vars
            .iter()
            .map(|(key, token)| Ok((key.clone(), resolve(format!("env_vars.{key}"), token)?)))
            .collect::<CoreResult<IndexMap<_, _>>>()?;

        let dockerfile = resolve("dockerfile".to_string(), &spec.dockerfile)?;
        let build = BuildDirective::from_path(id.as_str(), &dockerfile)?;

        let depends_on = edges
            .iter()
            .filter(|edge| &edge.consumer == id)
            .map(|edge| {
                (
                    edge.producer.to_string(),
                    DependsOn {
                        condition: edge.condition,
                    },
                )
            })
            .collect();

        Ok(ManifestService {
            build: Some(build),
            environment,
            ports,
            depends_on,
            ..ManifestService::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialStore;
    use crate::graph::ResourceGraph;
    use serde_json::json;

    fn creds(id: &ResourceId) -> CredentialSet {
        CredentialSet::new(id, "useruseruseruser".to_string(), "passpasspasspass".to_string())
    }

    #[test]
    fn test_build_directive_split() {
        let build = BuildDirective::from_path("svc", "/app/svc/Dockerfile").unwrap();
        assert_eq!(build.context, "/app/svc");
        assert_eq!(build.dockerfile, "Dockerfile");

        let root = BuildDirective::from_path("svc", "/Dockerfile.dev").unwrap();
        assert_eq!(root.context, "/");
        assert_eq!(root.dockerfile, "Dockerfile.dev");
    }

    #[test]
    fn test_build_directive_rejects_relative() {
        assert!(matches!(
            BuildDirective::from_path("svc", "Dockerfile"),
            Err(CoreError::MalformedResource { ref id, ref field, .. })
                if id == "svc" && field == "dockerfile"
        ));
    }

    #[test]
    fn test_data_store_service() {
        let config = CompileConfig::default();
        let id = ResourceId::new("mydb").unwrap();
        let service = Synthesizer::new(&config)
            .data_store(&id, &creds(&id), 0)
            .unwrap();

        assert_eq!(service.image.as_deref(), Some("postgres:latest"));
        assert_eq!(service.environment["POSTGRES_USER"], "useruseruseruser");
        assert_eq!(service.environment["POSTGRES_PASSWORD"], "passpasspasspass");
        assert_eq!(service.environment["POSTGRES_DB"], "mydb");
        assert_eq!(service.ports, vec!["5432:5432".to_string()]);
        let check = service.healthcheck.unwrap();
        assert_eq!(check.test[0], "CMD-SHELL");
        assert_eq!(check.test[1], "psql -U useruseruseruser -d mydb -c 'SELECT 1;'");
        assert_eq!(check.interval, "5s");
        assert_eq!(check.timeout, "5s");
        assert_eq!(check.retries, 5);
        assert!(service.build.is_none());
    }

    #[test]
    fn test_data_store_host_ports_do_not_collide() {
        let config = CompileConfig::default();
        let id = ResourceId::new("second").unwrap();
        let service = Synthesizer::new(&config)
            .data_store(&id, &creds(&id), 1)
            .unwrap();
        assert_eq!(service.ports, vec!["5433:5432".to_string()]);
    }

    #[test]
    fn test_compute_unit_service() {
        let graph = ResourceGraph::from_value(&json!({"resources": {
            "backend": {
                "type": "ec2",
                "ports": ["8080", "9090"],
                "env_vars": {"MODE": "prod"},
                "dockerfile": "/app/backend/Dockerfile"
            }
        }}))
        .unwrap();
        let store = CredentialStore::new();
        let resolver = Resolver::new(&graph, &store);
        let config = CompileConfig::default();
        let (id, spec) = graph.compute_units().next().unwrap();

        let service = Synthesizer::new(&config)
            .compute_unit(id, spec, &resolver, &[])
            .unwrap();
        assert_eq!(service.ports, vec!["8080:8080", "9090:9090"]);
        assert_eq!(service.environment["MODE"], "prod");
        assert_eq!(
            service.build,
            Some(BuildDirective {
                context: "/app/backend".to_string(),
                dockerfile: "Dockerfile".to_string()
            })
        );
        assert!(service.depends_on.is_empty());
        assert!(service.image.is_none());
    }

    #[test]
    fn test_compute_unit_error_names_field() {
        let graph = ResourceGraph::from_value(&json!({"resources": {
            "backend": {
                "type": "ec2",
                "ports": [],
                "env_vars": {"DB_URL": "ref:missing:url"},
                "dockerfile": "/a/Dockerfile"
            }
        }}))
        .unwrap();
        let store = CredentialStore::new();
        let resolver = Resolver::new(&graph, &store);
        let config = CompileConfig::default();
        let (id, spec) = graph.compute_units().next().unwrap();

        let err = Synthesizer::new(&config)
            .compute_unit(id, spec, &resolver, &[])
            .unwrap_err();
        match &err {
            CoreError::InField { resource, field, .. } => {
                assert_eq!(resource, "backend");
                assert_eq!(field, "env_vars.DB_URL");
            }
            other => panic!("expected InField, got {other:?}"),
        }
        assert!(matches!(err.root_cause(), CoreError::ResourceNotFound { id } if id == "missing"));
    }

    #[test]
    fn test_resolved_port_must_be_numeric() {
        let graph = ResourceGraph::from_value(&json!({"resources": {
            "api": {"type": "ec2", "ports": ["8000"], "env_vars": {}, "dockerfile": "/api/Dockerfile"},
            "web": {"type": "ec2", "ports": ["ref:api:host"], "env_vars": {}, "dockerfile": "/web/Dockerfile"}
        }}))
        .unwrap();
        let store = CredentialStore::new();
        let resolver = Resolver::new(&graph, &store);
        let config = CompileConfig::default();
        let (id, spec) = graph.compute_units().nth(1).unwrap();

        let err = Synthesizer::new(&config)
            .compute_unit(id, spec, &resolver, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedResource { ref id, ref field, .. } if id == "web" && field == "ports[0]"
        ));
    }

    #[test]
    fn test_yaml_omits_empty_blocks() {
        let mut manifest = Manifest::new("3");
        manifest.services.insert(
            "worker".to_string(),
            ManifestService {
                build: Some(BuildDirective {
                    context: "/w".to_string(),
                    dockerfile: "Dockerfile".to_string(),
                }),
                ..ManifestService::default()
            },
        );
        let yaml = manifest.to_yaml().unwrap();
        assert!(yaml.contains("version: '3'") || yaml.contains("version: \"3\""));
        assert!(!yaml.contains("depends_on"));
        assert!(!yaml.contains("environment"));
        assert_eq!(Manifest::from_yaml(&yaml).unwrap(), manifest);
    }
}

//! Typed declaration builder.
//!
//! Produces the JSON declaration document the compiler ingests. A compute
//! unit goes through one builder stage per required field, and only the
//! last stage yields a [`ComputeUnitDeclaration`], so an incomplete
//! declaration cannot be expressed.
//!
//! ```
//! use lif_plan::{ComputeUnit, Infrastructure};
//!
//! let mut infra = Infrastructure::new();
//! let db = infra.postgres("mydb").unwrap();
//! let backend = ComputeUnit::builder("backend")
//!     .unwrap()
//!     .ports(["8080"])
//!     .env_vars([("DB_URL", db.url)])
//!     .dockerfile("/srv/backend/Dockerfile")
//!     .unwrap();
//! infra.add(backend).unwrap();
//! assert_eq!(infra.to_json()["resources"]["backend"]["env_vars"]["DB_URL"], "ref:mydb:url");
//! ```

use crate::graph::{ComputeUnitSpec, ResourceDeclaration, ResourceGraph};
use crate::resolve::Reference;
use indexmap::IndexMap;
use lif_core::{CoreError, CoreResult, ResourceId};
use serde_json::{Value, json};
use std::path::Path;

/// References to the generated credentials of a data store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresExposes {
    /// Connection url
    pub url: Reference,
    /// User name
    pub user: Reference,
    /// Password
    pub password: Reference,
}

/// A complete compute unit declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeUnitDeclaration {
    id: ResourceId,
    spec: ComputeUnitSpec,
}

impl ComputeUnitDeclaration {
    /// Declared id
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Declared fields
    #[must_use]
    pub fn spec(&self) -> &ComputeUnitSpec {
        &self.spec
    }

    /// Reference to an exposed property (`host`, `port`, `url`, `dockerfile`)
    #[must_use]
    pub fn expose(&self, property: &str) -> Reference {
        Reference::new(&self.id, property)
    }
}

/// Entry point of the compute unit builder
pub struct ComputeUnit;

impl ComputeUnit {
    /// Start declaring a compute unit
    ///
    /// # Errors
    ///
    /// Returns error if the id is not a valid resource id
    pub fn builder(id: &str) -> CoreResult<ComputeUnitBuilder> {
        Ok(ComputeUnitBuilder {
            id: ResourceId::new(id)?,
        })
    }
}

/// Builder stage awaiting ports
pub struct ComputeUnitBuilder {
    id: ResourceId,
}

impl ComputeUnitBuilder {
    /// Set the published ports
    #[must_use]
    pub fn ports<I, P>(self, ports: I) -> WithPorts
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        WithPorts {
            id: self.id,
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

/// Builder stage awaiting environment variables
pub struct WithPorts {
    id: ResourceId,
    ports: Vec<String>,
}

impl WithPorts {
    /// Set the environment variables; values may be references
    #[must_use]
    pub fn env_vars<I, K, V>(self, env_vars: I) -> WithEnvVars
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        WithEnvVars {
            id: self.id,
            ports: self.ports,
            env_vars: env_vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Builder stage awaiting the Dockerfile
pub struct WithEnvVars {
    id: ResourceId,
    ports: Vec<String>,
    env_vars: IndexMap<String, String>,
}

impl WithEnvVars {
    /// Set the Dockerfile, made absolute against the working directory
    ///
    /// # Errors
    ///
    /// Returns error if the path cannot be made absolute or is not UTF-8
    pub fn dockerfile(self, path: impl AsRef<Path>) -> CoreResult<ComputeUnitDeclaration> {
        let id = self.id;
        let absolute = std::path::absolute(path.as_ref()).map_err(|e| {
            CoreError::malformed(id.as_str(), "dockerfile", e.to_string())
        })?;
        let dockerfile = absolute
            .to_str()
            .ok_or_else(|| CoreError::malformed(id.as_str(), "dockerfile", "is not valid UTF-8"))?
            .to_string();
        Ok(ComputeUnitDeclaration {
            id,
            spec: ComputeUnitSpec {
                ports: self.ports,
                env_vars: self.env_vars,
                dockerfile,
            },
        })
    }
}

/// Collected declarations of one program
#[derive(Debug, Clone, Default)]
pub struct Infrastructure {
    declarations: Vec<ResourceDeclaration>,
}

impl Infrastructure {
    /// Create an empty declaration set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a postgres data store
    ///
    /// # Errors
    ///
    /// Returns error if the id is invalid or already declared
    pub fn postgres(&mut self, id: &str) -> CoreResult<PostgresExposes> {
        let id = ResourceId::new(id)?;
        self.push(ResourceDeclaration::data_store(id.clone()))?;
        Ok(PostgresExposes {
            url: Reference::new(&id, "url"),
            user: Reference::new(&id, "user"),
            password: Reference::new(&id, "password"),
        })
    }

    /// Add a compute unit
    ///
    /// # Errors
    ///
    /// Returns error if the id is already declared
    pub fn add(&mut self, unit: ComputeUnitDeclaration) -> CoreResult<()> {
        self.push(ResourceDeclaration::compute_unit(unit.id, unit.spec))
    }

    fn push(&mut self, decl: ResourceDeclaration) -> CoreResult<()> {
        if self.declarations.iter().any(|d| d.id == decl.id) {
            return Err(CoreError::malformed(
                decl.id.as_str(),
                "id",
                "is declared more than once",
            ));
        }
        self.declarations.push(decl);
        Ok(())
    }

    /// Build the resource graph directly
    ///
    /// # Errors
    ///
    /// Returns error if two declarations share an id
    pub fn to_graph(&self) -> CoreResult<ResourceGraph> {
        ResourceGraph::from_declarations(self.declarations.iter().cloned())
    }

    /// The JSON declaration document
    #[must_use]
    pub fn to_json(&self) -> Value {
        let resources: serde_json::Map<String, Value> = self
            .declarations
            .iter()
            .map(|d| {
                (
                    d.id.to_string(),
                    serde_json::to_value(&d.spec).unwrap_or(Value::Null),
                )
            })
            .collect();
        json!({ "resources": resources })
    }
}

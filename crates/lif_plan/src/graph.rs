//! Typed resource graph.
//!
//! The graph is the single ingestion boundary: the untyped declaration
//! document is converted into closed, typed [`ResourceSpec`] values here,
//! and every shape violation is reported here. Later phases only ever see
//! well-formed declarations.

use crate::resolve::Reference;
use indexmap::IndexMap;
use lif_core::{CoreError, CoreResult, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    /// Unique resource id
    pub id: ResourceId,
    /// Kind-specific fields
    pub spec: ResourceSpec,
}

impl ResourceDeclaration {
    /// Declare a data store
    #[must_use]
    pub fn data_store(id: ResourceId) -> Self {
        Self {
            id,
            spec: ResourceSpec::DataStore,
        }
    }

    /// Declare a compute unit
    #[must_use]
    pub fn compute_unit(id: ResourceId, spec: ComputeUnitSpec) -> Self {
        Self {
            id,
            spec: ResourceSpec::ComputeUnit(spec),
        }
    }

    /// Kind of this resource
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }
}

/// Kind-specific declaration, tagged by the wire `type` discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceSpec {
    /// Data store, no fields beyond `type`
    #[serde(rename = "postgres")]
    DataStore,
    /// Compute unit
    #[serde(rename = "ec2")]
    ComputeUnit(ComputeUnitSpec),
}

impl ResourceSpec {
    /// Kind of this spec
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DataStore => ResourceKind::DataStore,
            Self::ComputeUnit(_) => ResourceKind::ComputeUnit,
        }
    }
}

/// Declared fields of a compute unit
///
/// Every value may be a literal or a `ref:<id>:<property>` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnitSpec {
    /// Port numbers published as `port:port`
    pub ports: Vec<String>,
    /// Environment variables
    pub env_vars: IndexMap<String, String>,
    /// Absolute path to the Dockerfile
    pub dockerfile: String,
}

impl ComputeUnitSpec {
    /// Every field value paired with its field path, in a stable order
    pub fn fields(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        let ports = self
            .ports
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("ports[{i}]"), p.as_str()));
        let env = self
            .env_vars
            .iter()
            .map(|(k, v)| (format!("env_vars.{k}"), v.as_str()));
        ports
            .chain(env)
            .chain(std::iter::once(("dockerfile".to_string(), self.dockerfile.as_str())))
    }

    /// Every reference appearing in any field
    pub fn references(&self) -> impl Iterator<Item = Reference> + '_ {
        self.fields().filter_map(|(_, value)| Reference::detect(value))
    }
}

/// Immutable graph of declared resources, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGraph {
    resources: IndexMap<ResourceId, ResourceDeclaration>,
}

impl ResourceGraph {
    /// Build a graph from typed declarations
    ///
    /// # Errors
    ///
    /// Returns error if two declarations share an id
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = ResourceDeclaration>,
    ) -> CoreResult<Self> {
        let mut resources = IndexMap::new();
        for decl in declarations {
            if resources.contains_key(&decl.id) {
                return Err(CoreError::malformed(
                    decl.id.as_str(),
                    "id",
                    "is declared more than once",
                ));
            }
            resources.insert(decl.id.clone(), decl);
        }
        Ok(Self { resources })
    }

    /// Parse and ingest a JSON declaration document
    ///
    /// # Errors
    ///
    /// Returns error if the input is not JSON or any resource is malformed
    pub fn from_json(input: &[u8]) -> CoreResult<Self> {
        let value: Value = serde_json::from_slice(input)?;
        Self::from_value(&value)
    }

    /// Ingest an untyped declaration document
    ///
    /// All violations are collected; a single one is returned as is,
    /// several are returned as [`CoreError::Multiple`].
    ///
    /// # Errors
    ///
    /// Returns error if the document or any resource is malformed
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let root = value.as_object().ok_or_else(|| CoreError::MalformedInput {
            reason: "document must be a JSON object".to_string(),
        })?;
        let resources = root
            .get("resources")
            .ok_or_else(|| CoreError::MalformedInput {
                reason: "missing \"resources\"".to_string(),
            })?
            .as_object()
            .ok_or_else(|| CoreError::MalformedInput {
                reason: "\"resources\" must be an object".to_string(),
            })?;

        let mut declarations = Vec::with_capacity(resources.len());
        let mut errors = Vec::new();
        for (id, fields) in resources {
            match ingest_resource(id, fields) {
                Ok(decl) => declarations.push(decl),
                Err(err) => errors.push(err),
            }
        }

        match errors.len() {
            0 => Self::from_declarations(declarations),
            1 => Err(errors.remove(0)),
            _ => Err(CoreError::Multiple { errors }),
        }
    }

    /// Get a resource by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceDeclaration> {
        self.resources.get(id)
    }

    /// Check whether a resource is declared
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// All resources in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values()
    }

    /// Data store ids in declaration order
    pub fn data_stores(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources
            .values()
            .filter(|r| r.kind() == ResourceKind::DataStore)
            .map(|r| &r.id)
    }

    /// Compute units in declaration order
    pub fn compute_units(&self) -> impl Iterator<Item = (&ResourceId, &ComputeUnitSpec)> {
        self.resources.values().filter_map(|r| match &r.spec {
            ResourceSpec::ComputeUnit(spec) => Some((&r.id, spec)),
            ResourceSpec::DataStore => None,
        })
    }

    /// Get total resource count
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn ingest_resource(id: &str, fields: &Value) -> CoreResult<ResourceDeclaration> {
    let resource_id = ResourceId::new(id)?;
    let fields = fields
        .as_object()
        .ok_or_else(|| CoreError::malformed(id, "type", "resource must be an object"))?;
    let type_name = match fields.get("type") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(CoreError::malformed(id, "type", "must be a string")),
        None => return Err(CoreError::malformed(id, "type", "is missing")),
    };
    let kind = ResourceKind::from_type_name(type_name).ok_or_else(|| {
        CoreError::UnknownResourceType {
            id: id.to_string(),
            kind: type_name.clone(),
        }
    })?;

    match kind {
        ResourceKind::DataStore => Ok(ResourceDeclaration::data_store(resource_id)),
        ResourceKind::ComputeUnit => {
            let spec = ComputeUnitSpec {
                ports: ingest_ports(id, fields.get("ports"))?,
                env_vars: ingest_env_vars(id, fields.get("env_vars"))?,
                dockerfile: ingest_dockerfile(id, fields.get("dockerfile"))?,
            };
            Ok(ResourceDeclaration::compute_unit(resource_id, spec))
        }
    }
}

fn ingest_ports(id: &str, value: Option<&Value>) -> CoreResult<Vec<String>> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(CoreError::malformed(id, "ports", "must be a list of strings")),
        None => return Err(CoreError::malformed(id, "ports", "is missing")),
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = format!("ports[{i}]");
            let port = item
                .as_str()
                .ok_or_else(|| CoreError::malformed(id, &field, "must be a string"))?;
            if Reference::detect(port).is_none() {
                check_port(id, &field, port)?;
            }
            Ok(port.to_string())
        })
        .collect()
}

fn ingest_env_vars(id: &str, value: Option<&Value>) -> CoreResult<IndexMap<String, String>> {
    let entries = match value {
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            return Err(CoreError::malformed(
                id,
                "env_vars",
                "must be a mapping of string to string",
            ));
        }
        None => return Err(CoreError::malformed(id, "env_vars", "is missing")),
    };
    entries
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key.clone(), s.clone())),
            _ => Err(CoreError::malformed(
                id,
                format!("env_vars.{key}"),
                "must be a string",
            )),
        })
        .collect()
}

fn ingest_dockerfile(id: &str, value: Option<&Value>) -> CoreResult<String> {
    let path = match value {
        Some(Value::String(path)) => path,
        Some(_) => return Err(CoreError::malformed(id, "dockerfile", "must be a string")),
        None => return Err(CoreError::malformed(id, "dockerfile", "is missing")),
    };
    if Reference::detect(path).is_none() {
        check_dockerfile(id, path)?;
    }
    Ok(path.clone())
}

/// Check that a value is a TCP port number
///
/// # Errors
///
/// Returns [`CoreError::MalformedResource`] naming `id` and `field`
pub fn check_port(id: &str, field: &str, port: &str) -> CoreResult<u16> {
    match port.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CoreError::malformed(
            id,
            field,
            format!("{port:?} is not a port number"),
        )),
    }
}

/// Check that a value is an absolute Dockerfile path
///
/// # Errors
///
/// Returns [`CoreError::MalformedResource`] naming `id` and `dockerfile`
pub fn check_dockerfile(id: &str, path: &str) -> CoreResult<()> {
    let p = Path::new(path);
    if !p.is_absolute() {
        return Err(CoreError::malformed(
            id,
            "dockerfile",
            format!("{path:?} is not an absolute path"),
        ));
    }
    if p.file_name().is_none() {
        return Err(CoreError::malformed(
            id,
            "dockerfile",
            format!("{path:?} does not name a file"),
        ));
    }
    Ok(())
}

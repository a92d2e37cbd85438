//! Reference resolution.
//!
//! A reference token `ref:<id>:<property>` is resolved through two tiers:
//! the credentials generated for data stores during this compile, then the
//! declared fields of statically resolvable resources in the graph. A token
//! without the reference shape is a literal and resolves to itself.

use crate::credential::CredentialStore;
use crate::graph::{ComputeUnitSpec, ResourceGraph, ResourceSpec};
use lif_core::{CoreError, CoreResult, ResourceId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

/// Leading segment of every reference token
pub const REF_PREFIX: &str = "ref";

/// Properties a compute unit exposes to other resources
pub const COMPUTE_PROPERTIES: [&str; 4] = ["host", "port", "url", "dockerfile"];

/// Symbolic reference to a property of another resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Id of the referenced resource
    pub target: String,
    /// Property of the referenced resource
    pub property: String,
}

impl Reference {
    /// Create a reference to a property of a resource
    #[must_use]
    pub fn new(target: &ResourceId, property: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            property: property.into(),
        }
    }

    /// Detect the `ref:<id>:<property>` shape
    ///
    /// Anything else is a literal and yields `None`.
    #[must_use]
    pub fn detect(token: &str) -> Option<Self> {
        let mut parts = token.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(REF_PREFIX), Some(target), Some(property), None) => Some(Self {
                target: target.to_string(),
                property: property.to_string(),
            }),
            _ => None,
        }
    }

    /// Serialize as a `ref:<id>:<property>` token
    #[must_use]
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Reference {
    type Err = CoreError;

    /// Strict parse: the token must be a reference with a non-empty id and property
    fn from_str(s: &str) -> CoreResult<Self> {
        match Self::detect(s) {
            Some(r) if !r.target.is_empty() && !r.property.is_empty() => Ok(r),
            _ => Err(CoreError::InvalidRefFormat {
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", REF_PREFIX, self.target, self.property)
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.token()
    }
}

impl From<&Reference> for String {
    fn from(r: &Reference) -> Self {
        r.token()
    }
}

/// Resolver over one compile's graph and generated credentials
pub struct Resolver<'a> {
    graph: &'a ResourceGraph,
    credentials: &'a CredentialStore,
    /// Compute units whose properties are being resolved, for cycle detection
    visiting: RefCell<Vec<String>>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver
    #[must_use]
    pub fn new(graph: &'a ResourceGraph, credentials: &'a CredentialStore) -> Self {
        Self {
            graph,
            credentials,
            visiting: RefCell::new(Vec::new()),
        }
    }

    /// Resolve a token to a concrete value
    ///
    /// Tokens without the reference shape are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if the token is a reference that cannot be resolved
    pub fn resolve(&self, token: &str) -> CoreResult<String> {
        match Reference::detect(token) {
            Some(reference) => self.resolve_reference(&reference),
            None => Ok(token.to_string()),
        }
    }

    /// Resolve a reference to a concrete value
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PropertyNotFound`], [`CoreError::UnsupportedResourceType`]
    /// or [`CoreError::ResourceNotFound`] depending on the lookup tier that fails
    pub fn resolve_reference(&self, reference: &Reference) -> CoreResult<String> {
        let Reference { target, property } = reference;

        if let Some(set) = self.credentials.get(target) {
            return set
                .property(property)
                .map(str::to_string)
                .ok_or_else(|| CoreError::PropertyNotFound {
                    id: target.clone(),
                    property: property.clone(),
                });
        }

        match self.graph.get(target) {
            Some(decl) => match &decl.spec {
                ResourceSpec::ComputeUnit(spec) => self.compute_property(&decl.id, spec, property),
                ResourceSpec::DataStore => Err(CoreError::UnsupportedResourceType {
                    id: target.clone(),
                    kind: decl.kind().to_string(),
                }),
            },
            None => Err(CoreError::ResourceNotFound { id: target.clone() }),
        }
    }

    fn compute_property(
        &self,
        id: &ResourceId,
        spec: &ComputeUnitSpec,
        property: &str,
    ) -> CoreResult<String> {
        let not_found = || CoreError::PropertyNotFound {
            id: id.to_string(),
            property: property.to_string(),
        };

        {
            let mut visiting = self.visiting.borrow_mut();
            if let Some(start) = visiting.iter().position(|v| v == id.as_str()) {
                let mut cycle = visiting[start..].to_vec();
                cycle.push(id.to_string());
                return Err(CoreError::CyclicReference { cycle });
            }
            visiting.push(id.to_string());
        }

        let result = match property {
            "host" => Ok(id.to_string()),
            "port" => match spec.ports.first() {
                Some(port) => self.resolve(port),
                None => Err(not_found()),
            },
            "url" => match spec.ports.first() {
                Some(port) => self.resolve(port).map(|port| format!("http://{id}:{port}")),
                None => Err(not_found()),
            },
            "dockerfile" => self.resolve(&spec.dockerfile),
            _ => Err(not_found()),
        };

        self.visiting.borrow_mut().pop();
        result
    }
}

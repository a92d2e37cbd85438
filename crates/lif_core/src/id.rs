//! Identifiers for LIF resources.
//!
//! A resource id is the key of a resource in the declaration map. It is
//! also the compose service name, the network hostname and, for data
//! stores, the database name, so it must never contain the `:`
//! separator used by reference tokens.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Resource identifier - identifies a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource id, validating its shape
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty or contains `:` or whitespace
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::malformed(id, "id", "must not be empty"));
        }
        if id.contains(':') || id.chars().any(char::is_whitespace) {
            return Err(CoreError::malformed(
                id,
                "id",
                "must not contain ':' or whitespace",
            ));
        }
        Ok(Self(id))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource kind - the two kinds of resource the compiler models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Managed data store whose credentials the compiler generates
    #[serde(rename = "postgres")]
    DataStore,
    /// Buildable workload with ports, environment and a Dockerfile
    #[serde(rename = "ec2")]
    ComputeUnit,
}

impl ResourceKind {
    /// Wire name of the `type` discriminator
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::DataStore => "postgres",
            Self::ComputeUnit => "ec2",
        }
    }

    /// Parse a `type` discriminator
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "postgres" => Some(Self::DataStore),
            "ec2" => Some(Self::ComputeUnit),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataStore => write!(f, "DataStore({})", self.type_name()),
            Self::ComputeUnit => write!(f, "ComputeUnit({})", self.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_new() {
        let id = ResourceId::new("mydb").unwrap();
        assert_eq!(id.as_str(), "mydb");
        assert_eq!(id.to_string(), "mydb");
    }

    #[test]
    fn test_resource_id_rejects_empty() {
        assert!(matches!(
            ResourceId::new(""),
            Err(CoreError::MalformedResource { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_resource_id_rejects_separator() {
        assert!(ResourceId::new("a:b").is_err());
        assert!(ResourceId::new("a b").is_err());
    }

    #[test]
    fn test_resource_id_serde() {
        let id: ResourceId = serde_json::from_str("\"backend\"").unwrap();
        assert_eq!(id.as_str(), "backend");
        assert!(serde_json::from_str::<ResourceId>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"backend\"");
    }

    #[test]
    fn test_kind_type_names() {
        assert_eq!(ResourceKind::from_type_name("postgres"), Some(ResourceKind::DataStore));
        assert_eq!(ResourceKind::from_type_name("ec2"), Some(ResourceKind::ComputeUnit));
        assert_eq!(ResourceKind::from_type_name("redis"), None);
        assert_eq!(ResourceKind::DataStore.type_name(), "postgres");
    }

    proptest::proptest! {
        #[test]
        fn prop_ids_without_separator_are_accepted(id in "[a-z][a-z0-9_-]{0,20}") {
            let parsed = ResourceId::new(id.clone()).unwrap();
            proptest::prop_assert_eq!(parsed.as_str(), id.as_str());
        }
    }
}

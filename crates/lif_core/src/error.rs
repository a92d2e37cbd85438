//! Core error types for LIF.
//!
//! Every compile phase reports through [`CoreError`]. A compile is
//! all-or-nothing, so the first error (or the collected ingestion
//! violations) aborts it and no partial manifest is produced.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Input is not a well-formed declaration document
    #[error("Malformed input: {reason}")]
    MalformedInput { reason: String },

    /// The `type` discriminator of a resource is not recognized
    #[error("Unknown resource type {kind:?} for resource {id:?}")]
    UnknownResourceType { id: String, kind: String },

    /// A resource field is absent or has the wrong shape
    #[error("Malformed resource {id:?}: field {field:?} {reason}")]
    MalformedResource {
        id: String,
        field: String,
        reason: String,
    },

    /// A token that must be a reference does not have the `ref:<id>:<property>` shape
    #[error("Invalid ref format: {token:?}, expected format 'ref:resourceName:property'")]
    InvalidRefFormat { token: String },

    /// A reference points at a resource that is not declared
    #[error("Resource not found: {id:?}")]
    ResourceNotFound { id: String },

    /// A reference names a property the target does not expose
    #[error("Property {property:?} not found for resource {id:?}")]
    PropertyNotFound { id: String, property: String },

    /// The target resource cannot be resolved statically
    #[error("Unsupported resource type {kind} for resource {id:?}")]
    UnsupportedResourceType { id: String, kind: String },

    /// References between resources form a cycle
    #[error("Cyclic reference between resources: {}", cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    /// Several ingestion violations, in declaration order
    #[error("{} errors: {}", errors.len(), join_errors(errors))]
    Multiple { errors: Vec<CoreError> },

    /// An error raised while resolving one field of a consuming resource
    #[error("In resource {resource:?}, field {field:?}: {source}")]
    InField {
        resource: String,
        field: String,
        #[source]
        source: Box<CoreError>,
    },

    /// The manifest could not be rendered
    #[error("Serialization failed: {message}")]
    Serialize { message: String },
}

impl CoreError {
    /// Attach the consuming resource and field to an error
    #[must_use]
    pub fn in_field(self, resource: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InField {
            resource: resource.into(),
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`CoreError::MalformedResource`]
    #[must_use]
    pub fn malformed(
        id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedResource {
            id: id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The innermost error, with field context stripped
    #[must_use]
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::InField { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Stable snake-case name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InField { source, .. } => source.kind(),
            Self::MalformedInput { .. } => "malformed_input",
            Self::UnknownResourceType { .. } => "unknown_resource_type",
            Self::MalformedResource { .. } => "malformed_resource",
            Self::InvalidRefFormat { .. } => "invalid_ref_format",
            Self::ResourceNotFound { .. } => "resource_not_found",
            Self::PropertyNotFound { .. } => "property_not_found",
            Self::UnsupportedResourceType { .. } => "unsupported_resource_type",
            Self::CyclicReference { .. } => "cyclic_reference",
            Self::Multiple { .. } => "multiple",
            Self::Serialize { .. } => "serialize",
        }
    }
}

fn join_errors(errors: &[CoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput {
            reason: err.to_string(),
        }
    }
}

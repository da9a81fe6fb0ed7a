//! # Error Types
//!
//! Error taxonomy for Gateway translation using `thiserror`.

use crate::model::ObjectRef;

/// Custom result type for translation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the translator and its command line boundary.
///
/// Every translation variant names the object (and field) that caused it, so a
/// failure can be diagnosed without re-running with verbose logging.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A referenced Gateway, Service or Secret is absent from the snapshot
    #[error("{object} not found{}", referenced_by_suffix(.referenced_by))]
    NotFound { object: ObjectRef, referenced_by: Option<String> },

    /// A cross-namespace reference without a matching ReferenceGrant
    #[error("{from} is not permitted to reference {to} ({field}): no matching ReferenceGrant in the target namespace")]
    UnauthorizedReference { from: ObjectRef, to: ObjectRef, field: String },

    /// A match, filter, protocol or backend kind the translator does not implement
    #[error("unsupported construct in {object} at {field}: {detail}")]
    Unsupported { object: ObjectRef, field: String, detail: String },

    /// Malformed input, such as a Secret without a certificate
    #[error("invalid {object} at {field}: {detail}")]
    Invalid { object: ObjectRef, field: String, detail: String },

    /// Referential-integrity violation in the assembled resource graph
    #[error("inconsistent output: {resource_type} '{name}' {detail}")]
    InconsistentOutput { resource_type: String, name: String, detail: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest loading errors
    #[error("Manifest error in {source_name}: {message}")]
    Manifest { source_name: String, message: String },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },
}

fn referenced_by_suffix(referenced_by: &Option<String>) -> String {
    referenced_by.as_ref().map(|r| format!(" (referenced by {})", r)).unwrap_or_default()
}

impl Error {
    /// Create a not found error
    pub fn not_found(object: ObjectRef) -> Self {
        Self::NotFound { object, referenced_by: None }
    }

    /// Create a not found error naming the referencing field
    pub fn not_found_from<S: Into<String>>(object: ObjectRef, referenced_by: S) -> Self {
        Self::NotFound { object, referenced_by: Some(referenced_by.into()) }
    }

    /// Create an unauthorized-reference error
    pub fn unauthorized<F: Into<String>>(from: ObjectRef, to: ObjectRef, field: F) -> Self {
        Self::UnauthorizedReference { from, to, field: field.into() }
    }

    /// Create an unsupported-construct error
    pub fn unsupported<F: Into<String>, D: Into<String>>(object: ObjectRef, field: F, detail: D) -> Self {
        Self::Unsupported { object, field: field.into(), detail: detail.into() }
    }

    /// Create an invalid-input error
    pub fn invalid<F: Into<String>, D: Into<String>>(object: ObjectRef, field: F, detail: D) -> Self {
        Self::Invalid { object, field: field.into(), detail: detail.into() }
    }

    /// Create an inconsistent-output error
    pub fn inconsistent<T: Into<String>, N: Into<String>, D: Into<String>>(
        resource_type: T,
        name: N,
        detail: D,
    ) -> Self {
        Self::InconsistentOutput {
            resource_type: resource_type.into(),
            name: name.into(),
            detail: detail.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a manifest loading error
    pub fn manifest<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::Manifest { source_name: source_name.into(), message: message.into() }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Stable label for the error class, used in CLI output and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not-found",
            Error::UnauthorizedReference { .. } => "unauthorized-reference",
            Error::Unsupported { .. } => "unsupported-construct",
            Error::Invalid { .. } => "invalid-input",
            Error::InconsistentOutput { .. } => "inconsistent-output",
            Error::Config(_) => "config",
            Error::Manifest { .. } => "manifest",
            Error::Io { .. } => "io",
            Error::Serialization { .. } => "serialization",
        }
    }

    /// The input object the error is attributed to, if any.
    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            Error::NotFound { object, .. }
            | Error::Unsupported { object, .. }
            | Error::Invalid { object, .. } => Some(object),
            Error::UnauthorizedReference { from, .. } => Some(from),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config(format!("Validation failed: {}", message))
    }
}

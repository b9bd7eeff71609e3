//! Error types for DRAC operations.

use thiserror::Error;

/// Errors that can occur while talking to a DRAC.
#[derive(Debug, Error)]
pub enum DracError {
    /// HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The WS-Management endpoint rejected the request.
    #[error("WS-Man request failed: {status} - {message}")]
    Request { status: u16, message: String },

    /// Response body is not well-formed XML.
    #[error("invalid XML in response: {0}")]
    Xml(String),

    /// A required field is absent from the response.
    #[error("attribute '{field}' is missing from the response")]
    MissingField { field: String },

    /// A required field is present but carries no value.
    #[error("attribute '{field}' has no value in the response")]
    EmptyField { field: String },

    /// Response is well-formed but does not match the expected schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The DRAC executed the call and reported a failure.
    #[error("DRAC operation failed: {message}")]
    OperationFailed { message: String },

    /// The DRAC returned a return value other than the one the call expects.
    #[error("unexpected return value: expected {expected}, got {actual}")]
    UnexpectedReturnValue { expected: String, actual: String },

    /// Local pre-flight checks rejected the requested change.
    #[error("validation failed: {}", messages.join("; "))]
    Validation { messages: Vec<String> },

    /// The same attribute name was reported by more than one namespace.
    #[error("attribute '{name}' is defined in more than one namespace")]
    AggregationConflict { name: String },

    /// Attribute values were staged but the configuration job was not created.
    ///
    /// The staged values stay pending on the controller; only the job
    /// creation step has to be retried.
    #[error("values staged for {target} ({}) but job creation failed: {source}", staged.join(", "))]
    JobSchedulingFailed {
        target: String,
        staged: Vec<String>,
        #[source]
        source: Box<DracError>,
    },

    /// Caller passed an argument that can never succeed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DracError {
    /// True when attribute values were staged but no job was scheduled.
    #[must_use]
    pub fn is_partial_write(&self) -> bool {
        matches!(self, Self::JobSchedulingFailed { .. })
    }

    /// True for failures detected locally before any remote call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<quick_xml::Error> for DracError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Result type for DRAC operations.
pub type Result<T> = std::result::Result<T, DracError>;

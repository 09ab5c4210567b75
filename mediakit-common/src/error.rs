//! Unified error type shared by the MediaKit servers.
//!
//! Remote-call failures are split into three shapes: the endpoint answered
//! with a non-success status (`Http`), the request never produced a response
//! (`Network`), and everything else. Handlers wrap errors at the call site
//! and keep the original message.

use thiserror::Error;

/// Unified error type for the MediaKit servers.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Credential discovery or token refresh failures
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Cloud Storage operation failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The endpoint answered with a non-success HTTP status
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        /// Endpoint that was called
        endpoint: String,
        /// Status code the endpoint returned
        status: u16,
        /// Response body, or a description of why it could not be read
        body: String,
    },

    /// The request failed before any response arrived
    #[error("network error calling {endpoint}: {message}")]
    Network {
        /// Endpoint that was called
        endpoint: String,
        /// Underlying transport error message
        message: String,
    },

    /// Input validation failures, all fields joined into one message
    #[error("validation failed: {0}")]
    Validation(String),

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// ffmpeg/ffprobe execution errors
    #[error("media tool error: {0}")]
    Tool(String),

    /// An asynchronous operation did not finish within the wait budget
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// A remote operation finished in a terminal failure state
    #[error("operation {name} failed: {message}")]
    OperationFailed {
        /// Operation handle
        name: String,
        /// Error message reported by the status endpoint
        message: String,
    },
}

impl Error {
    /// HTTP-status error from a remote endpoint.
    pub fn http(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Error::Http {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    /// Network-level failure (no response was received).
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Input validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// ffmpeg/ffprobe failure.
    pub fn tool(message: impl Into<String>) -> Self {
        Error::Tool(message.into())
    }

    /// Timeout after the given number of seconds.
    pub fn timeout(seconds: u64) -> Self {
        Error::Timeout(seconds)
    }

    /// Terminal failure reported by an operation status endpoint.
    pub fn operation_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::OperationFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Classify a `reqwest` send error against the endpoint it was sent to.
    ///
    /// Errors that carry a status become `Http`; everything else is
    /// `Network`.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::http(endpoint, status.as_u16(), err.to_string()),
            None => Error::network(endpoint, err.to_string()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Credential errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Application Default Credentials could not be discovered
    #[error("no application default credentials found; run 'gcloud auth application-default login' or set GOOGLE_APPLICATION_CREDENTIALS")]
    NotConfigured,

    /// A token could not be obtained or refreshed
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Cloud Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object URI is not a valid `gs://bucket/path` reference
    #[error("invalid storage URI: {0}")]
    InvalidUri(String),

    /// An upload or download failed
    #[error("storage {verb} failed for {uri}: {message}")]
    Transfer {
        /// The URI that was being accessed
        uri: String,
        /// "upload" or "download"
        verb: &'static str,
        /// Failure description
        message: String,
    },

    /// Token acquisition failed during a storage operation
    #[error("storage auth error: {0}")]
    Auth(String),
}

impl StorageError {
    pub fn transfer(uri: impl Into<String>, verb: &'static str, message: impl Into<String>) -> Self {
        StorageError::Transfer {
            uri: uri.into(),
            verb,
            message: message.into(),
        }
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone)]
pub struct FieldError {
    /// Parameter field that failed validation
    pub field: String,
    /// What was wrong with it
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Error {
    /// Fold accumulated field errors into a single validation error.
    pub fn from_fields(errors: Vec<FieldError>) -> Self {
        let joined = errors
            .iter()
            .map(FieldError::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Error::Validation(joined)
    }
}

/// Result type alias using the unified error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_carries_endpoint_and_status() {
        let err = Error::http("https://example.test/v1/predict", 503, "backend overloaded");
        let msg = err.to_string();
        assert!(msg.contains("example.test"));
        assert!(msg.contains("503"));
        assert!(msg.contains("backend overloaded"));
    }

    #[test]
    fn network_error_is_distinct_from_http() {
        let err = Error::network("https://example.test", "connection refused");
        assert!(matches!(err, Error::Network { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn timeout_mentions_seconds() {
        let err = Error::timeout(300);
        assert!(err.to_string().contains("300 seconds"));
    }

    #[test]
    fn operation_failed_carries_handle() {
        let err = Error::operation_failed("operations/abc123", "quota exceeded");
        let msg = err.to_string();
        assert!(msg.contains("operations/abc123"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn config_error_converts_into_error() {
        let err: Error = ConfigError::MissingEnvVar("PROJECT_ID".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PROJECT_ID"));
    }

    #[test]
    fn storage_error_converts_into_error() {
        let err: Error = StorageError::InvalidUri("http://nope".into()).into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn io_error_converts_into_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn field_errors_fold_into_one_validation_message() {
        let err = Error::from_fields(vec![
            FieldError::new("prompt", "cannot be empty"),
            FieldError::new("sample_count", "must be between 1 and 4"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("prompt: cannot be empty"));
        assert!(msg.contains("sample_count"));
    }

    #[test]
    fn storage_transfer_error_names_verb_and_uri() {
        let err = StorageError::transfer("gs://bucket/clip.mp4", "upload", "403 Forbidden");
        let msg = err.to_string();
        assert!(msg.contains("upload"));
        assert!(msg.contains("gs://bucket/clip.mp4"));
    }
}

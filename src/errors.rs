use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the Pipedrive client.
#[derive(Debug, Error)]
pub enum PipedriveError {
    /// The remote API answered with a non-2xx status.
    #[error("Pipedrive returned {status}: {body}")]
    Http {
        /// HTTP status of the response.
        status: StatusCode,
        /// Raw response body, as returned by the remote API.
        body: String,
    },
    /// The request never produced a status (connection, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The response body did not have the expected shape.
    #[error("Protocol mismatch: {0}")]
    Protocol(String),
    /// A search returned no results.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A record violated a model invariant. Raised before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Error with context chain for better debugging.
    #[error("{context}: {source}")]
    WithContext {
        /// Additional context message.
        context: String,
        /// The underlying source of the error.
        #[source]
        source: Box<PipedriveError>,
    },
}

impl PipedriveError {
    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &PipedriveError {
        match self {
            PipedriveError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is a domain-level "no search results".
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), PipedriveError::NotFound(_))
    }

    /// HTTP status of the failed response, if the remote answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root() {
            PipedriveError::Http { status, .. } => Some(*status),
            PipedriveError::Request(e) => e.status(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipedriveError {
    fn from(err: serde_json::Error) -> Self {
        PipedriveError::Protocol(err.to_string())
    }
}

pub type Result<T, E = PipedriveError> = std::result::Result<T, E>;

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for `PipedriveError`.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipedriveError::WithContext {
            context: context.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipedriveError::WithContext {
            context: f(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_seen_through_context() {
        let err: Result<()> = Err(PipedriveError::NotFound("lead".to_string()));
        let err = err.context("finding minimal lead").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "finding minimal lead: Not found: lead");
    }

    #[test]
    fn test_http_status_exposed() {
        let err = PipedriveError::Http {
            status: StatusCode::BAD_REQUEST,
            body: "{\"success\":false}".to_string(),
        };
        let wrapped: Result<()> = Err(err);
        let wrapped = wrapped.with_context(|| "creating lead".to_string()).unwrap_err();

        assert_eq!(wrapped.status(), Some(StatusCode::BAD_REQUEST));
        assert!(!wrapped.is_not_found());
    }

    #[test]
    fn test_json_error_is_protocol() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: PipedriveError = parse.into();
        assert!(matches!(err, PipedriveError::Protocol(_)));
    }
}

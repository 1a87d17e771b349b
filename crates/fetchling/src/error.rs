//! Error taxonomy for client construction and request execution.

use crate::request::Method;
use crate::response::ResponseEnvelope;
use thiserror::Error;

/// Boxed error accepted from hooks and providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias using fetchling's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for fetchling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying transport could not be built.
    #[error("failed to build HTTP transport: {0}")]
    TransportBuild(#[source] reqwest::Error),

    /// Invalid caller-side configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// `data` and `url_params` were both supplied for a method that routes
    /// `data` to the query string.
    #[error("`data` and `url_params` are mutually exclusive for {0} requests")]
    AmbiguousParams(Method),

    /// The dynamic options provider failed.
    #[error("dynamic options provider failed: {0}")]
    DynamicOptions(#[source] BoxError),

    /// The before-send hook failed; the request was never sent.
    #[error("before-send hook failed: {0}")]
    BeforeSend(#[source] BoxError),

    /// The after-send hook failed after a successful exchange.
    #[error("after-send hook failed: {0}")]
    AfterSend(#[source] BoxError),

    /// The transport failed before a response was received.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a status outside the 200-299 range.
    #[error("server responded with status {status}")]
    Status {
        status: u16,
        response: Box<ResponseEnvelope>,
    },

    /// The response body could not be decoded as the requested type.
    #[error("failed to decode response body (status {status}): {source}")]
    Decode {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The response carried by this error, when one was received.
    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match self {
            Error::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The HTTP status carried by this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a request failure (transport error or non-2xx
    /// status), as opposed to a caller-side or hook error. Only request
    /// failures are routed through the configured error handler.
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_params_names_the_method() {
        let err = Error::AmbiguousParams(Method::Get);
        let message = err.to_string();
        assert!(message.contains("GET"));
        assert!(message.contains("mutually exclusive"));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config("bad MIME");
        assert_eq!(err.to_string(), "configuration error: bad MIME");
    }

    #[test]
    fn test_non_status_errors_carry_no_response() {
        let err = Error::config("x");
        assert!(err.response().is_none());
        assert!(err.status().is_none());
        assert!(!err.is_request_failure());
    }
}

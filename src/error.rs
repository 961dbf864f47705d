use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors produced while validating an email address.
///
/// The variants split into two classes. [`MissingCredential`](Error::MissingCredential)
/// and [`AuthenticationFailure`](Error::AuthenticationFailure) are configuration
/// defects and always reach the caller. [`Remote`](Error::Remote) covers
/// transient trouble with the classification service and may be tolerated by
/// fail-open entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// No API key was configured explicitly or found in the environment.
    #[error("no API key configured: pass one explicitly or set {env_var}")]
    MissingCredential {
        /// The environment variable that was consulted
        env_var: String,
    },

    /// The classification service rejected the API key.
    #[error("the email verification service rejected the API key")]
    AuthenticationFailure,

    /// The classification service could not produce a usable answer.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Returns `true` for errors that must never be swallowed by fail-open handling.
    ///
    /// ```
    /// use email_gate::{Error, RemoteError};
    ///
    /// assert!(Error::AuthenticationFailure.is_fatal());
    /// assert!(!Error::Remote(RemoteError::Timeout).is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::MissingCredential { .. } | Self::AuthenticationFailure => true,
            Self::Remote(_) => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Never echo credentials or upstream details to the client.
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Transient failures talking to the classification service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No response arrived before the configured deadline.
    #[error("email verification timed out")]
    Timeout,

    /// The service answered with a non-success status other than 401.
    #[error("email verification service returned HTTP {0}")]
    Status(u16),

    /// The request could not be sent or the response could not be read.
    #[error("email verification request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("malformed email verification response: {0}")]
    Malformed(String),
}

/// Invalid settings rejected by [`GateConfigBuilder::build`](crate::GateConfigBuilder::build).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The form field name was empty.
    #[error("field name must not be empty")]
    EmptyField,

    /// The timeout was zero.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    /// The body buffering limit was zero.
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    /// No classification state was configured for rejection.
    #[error("at least one state must be rejected")]
    EmptyRejectionSet,

    /// The base URL did not use http or https.
    #[error("base URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}

//! Request-time email validation.
//!
//! This crate checks a submitted email address against a remote
//! classification service and decides whether to accept it:
//! - **Direct validation**: [`EmailValidator`] returns the classification and
//!   flags; every error reaches the caller
//! - **Request interception**: [`web::EmailGate`] (and the axum middleware
//!   [`web::email_gate_middleware`]) rejects form submissions with HTTP 422
//! - **Schema refinement**: [`EmailRefinement`] answers `true`/`false` for
//!   validation libraries
//!
//! All three share one [`Pipeline`]: resolve the API key, verify with a
//! bounded timeout, apply the [`RejectionPolicy`].
//!
//! # Failure handling
//!
//! | Error                                | Direct | Interception | Refinement |
//! |--------------------------------------|--------|--------------|------------|
//! | [`Error::MissingCredential`]         | raised | raised       | raised     |
//! | [`Error::AuthenticationFailure`]     | raised | raised       | raised     |
//! | [`Error::Remote`] (timeout, 5xx, ..) | raised | pass through | `true`     |
//!
//! # Examples
//!
//! ```
//! use email_gate::{Classification, Decision, EmailState, RejectionPolicy, SubState};
//!
//! let policy = RejectionPolicy::default();
//! let verdict = Classification::new("bad@bad.com", EmailState::Invalid, SubState::FailedNoMailbox);
//!
//! match policy.decide(&verdict) {
//!     Decision::Deny(payload) => assert_eq!(payload.error, "Invalid email"),
//!     Decision::Allow => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classification;
mod config;
mod credential;
mod error;
mod logging;
mod pipeline;
mod policy;
mod refine;
#[cfg(test)]
mod testing;
mod validate;
mod verifier;

pub mod web;

pub use classification::{Classification, EmailState, SubState};
pub use config::{
    GateConfig, GateConfigBuilder, DEFAULT_BASE_URL, DEFAULT_FIELD, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_TIMEOUT,
};
pub use credential::{ApiKey, CredentialSource, DEFAULT_API_KEY_ENV};
pub use error::{ConfigError, Error, RemoteError};
pub use logging::MaskedEmail;
pub use pipeline::{FailureMode, Outcome, Pipeline};
pub use policy::{Decision, DenyDetails, DenyPayload, RejectionPolicy, DEFAULT_DENY_MESSAGE};
pub use refine::EmailRefinement;
pub use validate::{validate_email, EmailValidation, EmailValidator};
pub use verifier::{RemoteVerifier, Verifier, VERIFY_PATH};

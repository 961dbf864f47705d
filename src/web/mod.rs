//! HTTP integration.
//!
//! - [`extract_field`] / [`BodyKind`]: reading the address from JSON,
//!   url-encoded or multipart bodies
//! - [`EmailGate`]: the request-interception handler
//! - [`email_gate_middleware`]: the same handler as axum middleware
//!
//! Denials render as `422 Unprocessable Entity` with a JSON
//! [`DenyPayload`](crate::DenyPayload) body.

mod extract;
mod middleware;
mod response;

pub use extract::{extract_field, BodyKind};
pub use middleware::{email_gate_middleware, EmailGate, Interception};
pub use response::DENY_STATUS;

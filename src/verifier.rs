//! Remote classification of addresses.
//!
//! [`Verifier`] is the seam every entry point calls through. [`RemoteVerifier`]
//! is the production implementation; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::classification::{Classification, EmailState, SubState};
use crate::config::GateConfig;
use crate::credential::ApiKey;
use crate::error::{Error, RemoteError};
use crate::logging::MaskedEmail;

/// Path of the single-address verification endpoint, relative to the base URL.
pub const VERIFY_PATH: &str = "/api/v1/verify_inline";

/// Classifies one address.
///
/// Implementations make exactly one attempt and return either a complete
/// [`Classification`] or an error; never a partial result.
///
/// # Errors
///
/// - [`Error::AuthenticationFailure`] when the service rejects `key`
/// - [`Error::Remote`] for every other failure, timeouts included
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Classifies `email` using `key`.
    async fn verify(&self, email: &str, key: &ApiKey) -> Result<Classification, Error>;
}

/// HTTP client for the classification service.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RemoteVerifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteVerifier {
    /// Creates a verifier for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    /// Creates a verifier that reuses an existing client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Creates a verifier from the base URL and timeout in `config`.
    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.base_url(), config.timeout())
    }

    /// The configured upper bound on one call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, email: &str, key: &ApiKey) -> Result<Classification, Error> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, VERIFY_PATH))
            .query(&[("email", email)])
            .bearer_auth(key.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::AuthenticationFailure);
        }
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()).into());
        }

        let body = response.bytes().await.map_err(transport)?;
        let wire: WireResponse =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Malformed(e.to_string()))?;

        Ok(wire.into_classification()?)
    }
}

#[async_trait]
impl Verifier for RemoteVerifier {
    async fn verify(&self, email: &str, key: &ApiKey) -> Result<Classification, Error> {
        tracing::debug!(
            email = %MaskedEmail(email),
            timeout = ?self.timeout,
            "verifying email"
        );

        // Dropping the timed-out future aborts the in-flight request.
        match tokio::time::timeout(self.timeout, self.call(email, key)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout.into()),
        }
    }
}

// The request URL carries the address; keep it out of error text.
fn transport(err: reqwest::Error) -> Error {
    RemoteError::Transport(err.without_url().to_string()).into()
}

/// Response body of the verification endpoint.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    emails: Vec<WireEmail>,
}

#[derive(Debug, Deserialize)]
struct WireEmail {
    address: String,
    email_state: EmailState,
    #[serde(default)]
    email_sub_state: Option<SubState>,
    #[serde(default)]
    did_you_mean: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    canonical: Option<String>,
    #[serde(default)]
    mx_record: Option<String>,
    #[serde(default)]
    verified_at: Option<String>,
}

impl WireResponse {
    fn into_classification(self) -> Result<Classification, RemoteError> {
        let record = self
            .emails
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Malformed("response contained no results".to_string()))?;

        Ok(Classification {
            email: record.address,
            state: record.email_state,
            sub_state: record.email_sub_state.unwrap_or(SubState::UnknownError),
            suggestion: record.did_you_mean,
            domain: record.domain,
            canonical: record.canonical,
            mx_record: record.mx_record,
            verified_at: record.verified_at,
        })
    }
}

//! The decision core shared by every entry point.
//!
//! ```text
//! resolve credential ──► verify (network, bounded) ──► decide (pure)
//!        │                      │
//!        ▼                      ▼
//!  MissingCredential   AuthenticationFailure ─► always Err
//!   (always Err)       RemoteError ─► Err or Tolerated, per FailureMode
//! ```
//!
//! Entry points differ only in how they obtain the address, which
//! [`FailureMode`] they pass, and how they shape the [`Outcome`].

use std::sync::Arc;

use crate::classification::Classification;
use crate::config::GateConfig;
use crate::credential::ApiKey;
use crate::error::{Error, RemoteError};
use crate::logging::MaskedEmail;
use crate::policy::Decision;
use crate::verifier::{RemoteVerifier, Verifier};

/// How the pipeline treats [`Error::Remote`].
///
/// Missing or rejected credentials propagate under every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Return remote failures to the caller.
    Propagate,
    /// Treat remote failures as if the address had not been rejected.
    FailOpen,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service answered and the policy decided.
    Decided {
        /// The service's verdict.
        classification: Classification,
        /// What the policy made of it.
        decision: Decision,
    },
    /// The service failed and [`FailureMode::FailOpen`] let the input through.
    Tolerated(RemoteError),
}

impl Outcome {
    /// Returns `true` unless the policy denied the address.
    pub fn is_acceptable(&self) -> bool {
        match self {
            Outcome::Decided { decision, .. } => !decision.is_deny(),
            Outcome::Tolerated(_) => true,
        }
    }
}

/// Frozen configuration plus a verifier.
///
/// Cloning is cheap and clones share state; safe to use from many tasks.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<GateConfig>,
    verifier: Arc<dyn Verifier>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline that talks to the configured service.
    pub fn new(config: GateConfig) -> Self {
        let verifier = RemoteVerifier::from_config(&config);
        Self::with_verifier(config, verifier)
    }

    /// Creates a pipeline with a custom verifier.
    pub fn with_verifier(config: GateConfig, verifier: impl Verifier + 'static) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
        }
    }

    /// The frozen configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Resolves the API key for this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if no key is available.
    pub fn resolve_key(&self) -> Result<ApiKey, Error> {
        self.config
            .credentials()
            .resolve()
            .inspect_err(|err| tracing::error!(error = %err, "email verification misconfigured"))
    }

    /// Resolves the key, verifies `email` and applies the rejection policy.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredential`] before any network call, in every mode
    /// - [`Error::AuthenticationFailure`] in every mode
    /// - [`Error::Remote`] only under [`FailureMode::Propagate`]
    pub async fn run(&self, email: &str, mode: FailureMode) -> Result<Outcome, Error> {
        let key = self.resolve_key()?;
        self.run_with_key(email, &key, mode).await
    }

    /// Same as [`run`](Self::run) with an already resolved key.
    pub(crate) async fn run_with_key(
        &self,
        email: &str,
        key: &ApiKey,
        mode: FailureMode,
    ) -> Result<Outcome, Error> {
        match self.verifier.verify(email, key).await {
            Ok(classification) => {
                let decision = self.config.policy().decide(&classification);
                tracing::debug!(
                    email = %MaskedEmail(email),
                    state = %classification.state,
                    sub_state = %classification.sub_state,
                    denied = decision.is_deny(),
                    "email classified"
                );
                Ok(Outcome::Decided {
                    classification,
                    decision,
                })
            }
            Err(Error::Remote(err)) => match mode {
                FailureMode::Propagate => Err(Error::Remote(err)),
                FailureMode::FailOpen => {
                    tracing::warn!(
                        email = %MaskedEmail(email),
                        error = %err,
                        "email verification unavailable, allowing input"
                    );
                    Ok(Outcome::Tolerated(err))
                }
            },
            Err(err @ (Error::MissingCredential { .. } | Error::AuthenticationFailure)) => {
                tracing::error!(error = %err, "email verification misconfigured");
                Err(err)
            }
        }
    }
}

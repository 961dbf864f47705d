use serde::Serialize;

use crate::classification::{Classification, EmailState, SubState};
use crate::config::GateConfig;
use crate::error::Error;
use crate::pipeline::{FailureMode, Outcome, Pipeline};
use crate::verifier::Verifier;

/// Result of a direct validation: the classification plus convenience flags.
///
/// Serializes flat, e.g.
/// `{"email":..,"state":"risky","subState":"role","suggestion":null,..,"isValid":false,"isRejected":false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailValidation {
    /// The service's verdict.
    #[serde(flatten)]
    pub classification: Classification,
    /// State is `ok`.
    pub is_valid: bool,
    /// State is `invalid`.
    pub is_invalid: bool,
    /// State is `risky`.
    pub is_risky: bool,
    /// The configured rejection policy denies this address.
    pub is_rejected: bool,
}

impl EmailValidation {
    /// Primary disposition.
    pub fn state(&self) -> EmailState {
        self.classification.state
    }

    /// Reason for the disposition.
    pub fn sub_state(&self) -> SubState {
        self.classification.sub_state
    }

    /// Suggested correction, if any.
    pub fn suggestion(&self) -> Option<&str> {
        self.classification.suggestion.as_deref()
    }
}

/// Validates addresses passed in directly.
///
/// Unlike the interception handler and the refinement predicate, this entry
/// point never fails open: every error reaches the caller.
///
/// # Examples
///
/// ```no_run
/// use email_gate::{EmailValidator, GateConfig};
///
/// # async fn run() -> Result<(), email_gate::Error> {
/// let validator = EmailValidator::new(GateConfig::default());
/// let result = validator.validate("someone@example.com").await?;
/// if result.is_rejected {
///     println!("rejected: {}", result.sub_state());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EmailValidator {
    pipeline: Pipeline,
}

impl EmailValidator {
    /// Creates a validator that talks to the configured service.
    pub fn new(config: GateConfig) -> Self {
        Self {
            pipeline: Pipeline::new(config),
        }
    }

    /// Creates a validator with a custom verifier.
    pub fn with_verifier(config: GateConfig, verifier: impl Verifier + 'static) -> Self {
        Self {
            pipeline: Pipeline::with_verifier(config, verifier),
        }
    }

    /// Classifies `email` and applies the rejection policy.
    ///
    /// # Errors
    ///
    /// Returns every [`Error`] unchanged: missing or rejected credentials
    /// and remote failures alike.
    pub async fn validate(&self, email: &str) -> Result<EmailValidation, Error> {
        match self.pipeline.run(email, FailureMode::Propagate).await? {
            Outcome::Decided {
                classification,
                decision,
            } => Ok(EmailValidation {
                is_valid: classification.state == EmailState::Ok,
                is_invalid: classification.state == EmailState::Invalid,
                is_risky: classification.state == EmailState::Risky,
                is_rejected: decision.is_deny(),
                classification,
            }),
            // Propagate mode returns remote failures as errors.
            Outcome::Tolerated(err) => Err(err.into()),
        }
    }
}

/// Validates one address with a one-off validator built from `config`.
///
/// # Errors
///
/// See [`EmailValidator::validate`].
pub async fn validate_email(email: &str, config: GateConfig) -> Result<EmailValidation, Error> {
    EmailValidator::new(config).validate(email).await
}

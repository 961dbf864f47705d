use crate::config::GateConfig;
use crate::error::Error;
use crate::pipeline::{FailureMode, Pipeline};
use crate::verifier::Verifier;

/// Asynchronous predicate for schema-validation libraries.
///
/// `check` answers "is this address acceptable?". Remote failures count as
/// acceptable; a missing or rejected API key is returned as an error so the
/// validation runner can surface it.
///
/// # Examples
///
/// ```no_run
/// use email_gate::{EmailRefinement, GateConfig};
///
/// # async fn run() -> Result<(), email_gate::Error> {
/// let refinement = EmailRefinement::new(GateConfig::default());
/// if !refinement.check("someone@example.com").await? {
///     eprintln!("{}", refinement.message());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EmailRefinement {
    pipeline: Pipeline,
}

impl EmailRefinement {
    /// Creates a predicate that talks to the configured service.
    pub fn new(config: GateConfig) -> Self {
        Self {
            pipeline: Pipeline::new(config),
        }
    }

    /// Creates a predicate with a custom verifier.
    pub fn with_verifier(config: GateConfig, verifier: impl Verifier + 'static) -> Self {
        Self {
            pipeline: Pipeline::with_verifier(config, verifier),
        }
    }

    /// Message a validation library should attach when [`check`](Self::check) returns `false`.
    pub fn message(&self) -> &str {
        self.pipeline.config().policy().message()
    }

    /// Returns `true` if `email` is acceptable.
    ///
    /// # Errors
    ///
    /// [`Error::MissingCredential`] and [`Error::AuthenticationFailure`] only.
    pub async fn check(&self, email: &str) -> Result<bool, Error> {
        let outcome = self.pipeline.run(email, FailureMode::FailOpen).await?;
        Ok(outcome.is_acceptable())
    }
}

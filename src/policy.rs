use serde::Serialize;

use crate::classification::{Classification, EmailState, SubState};

/// Message placed in [`DenyPayload::error`] unless configured otherwise.
pub const DEFAULT_DENY_MESSAGE: &str = "Invalid email";

/// The set of classification states that disqualify an address.
///
/// Built once at setup and shared read-only afterwards. Only
/// [`Classification::state`] takes part in the decision; the sub-state is
/// reported in the payload but never rejects on its own.
///
/// # Examples
///
/// ```
/// use email_gate::{Classification, Decision, EmailState, RejectionPolicy, SubState};
///
/// let policy = RejectionPolicy::default().reject(EmailState::Risky);
///
/// let risky = Classification::new("a@b.com", EmailState::Risky, SubState::Role);
/// assert!(matches!(policy.decide(&risky), Decision::Deny(_)));
///
/// let ok = Classification::new("a@b.com", EmailState::Ok, SubState::Ok);
/// assert_eq!(policy.decide(&ok), Decision::Allow);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionPolicy {
    states: Vec<EmailState>,
    message: String,
}

impl Default for RejectionPolicy {
    /// Rejects only [`EmailState::Invalid`].
    fn default() -> Self {
        Self::new([EmailState::Invalid])
    }
}

impl RejectionPolicy {
    /// Creates a policy rejecting exactly the given states.
    pub fn new(states: impl IntoIterator<Item = EmailState>) -> Self {
        states.into_iter().fold(
            Self {
                states: Vec::new(),
                message: DEFAULT_DENY_MESSAGE.to_string(),
            },
            Self::reject,
        )
    }

    /// Adds a state to the rejection set.
    ///
    /// Adding a state that is already present has no effect.
    #[must_use]
    pub fn reject(mut self, state: EmailState) -> Self {
        if !self.states.contains(&state) {
            self.states.push(state);
        }
        self
    }

    /// Replaces the message used in deny payloads.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The rejected states, in insertion order.
    pub fn states(&self) -> &[EmailState] {
        &self.states
    }

    /// The deny message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if `state` is in the rejection set.
    pub fn rejects(&self, state: EmailState) -> bool {
        self.states.contains(&state)
    }

    /// Maps a classification to a decision. Pure; no I/O.
    pub fn decide(&self, classification: &Classification) -> Decision {
        if !self.rejects(classification.state) {
            return Decision::Allow;
        }

        Decision::Deny(DenyPayload {
            error: self.message.clone(),
            details: DenyDetails {
                state: classification.state,
                sub_state: classification.sub_state,
                suggestion: classification.suggestion.clone(),
            },
        })
    }
}

/// Outcome of [`RejectionPolicy::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The address is acceptable.
    Allow,
    /// The address is rejected, with the body to report.
    Deny(DenyPayload),
}

impl Decision {
    /// Returns `true` for [`Decision::Deny`].
    pub fn is_deny(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }
}

/// Body of a rejection: `{ error, details: { state, subState, suggestion } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyPayload {
    /// Human-readable summary.
    pub error: String,
    /// Copied verbatim from the classification.
    pub details: DenyDetails,
}

/// Classification fields echoed in a [`DenyPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyDetails {
    /// Primary disposition.
    pub state: EmailState,
    /// Reason for the disposition.
    pub sub_state: SubState,
    /// Suggested correction; serialized as `null` when absent.
    pub suggestion: Option<String>,
}

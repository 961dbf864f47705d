//! Canonical classification model.
//!
//! Every verifier normalises the service's answer into [`Classification`].
//! The enums deserialize both the canonical names and the service's wire
//! spellings; unrecognised strings fall back to the `unknown` members.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary disposition the service assigns to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailState {
    /// The mailbox exists and accepts mail.
    Ok,
    /// The address cannot receive mail.
    #[serde(alias = "email_invalid")]
    Invalid,
    /// The address may receive mail but carries delivery risk.
    Risky,
    /// The domain accepts every address, so the mailbox cannot be confirmed.
    #[serde(alias = "accept-all")]
    AcceptAll,
    /// The service could not reach a verdict.
    #[serde(other)]
    Unknown,
}

impl EmailState {
    /// Every state, in declaration order.
    pub const ALL: [EmailState; 5] = [
        EmailState::Ok,
        EmailState::Invalid,
        EmailState::Risky,
        EmailState::AcceptAll,
        EmailState::Unknown,
    ];

    /// Canonical name as it appears in payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            EmailState::Ok => "ok",
            EmailState::Invalid => "invalid",
            EmailState::Risky => "risky",
            EmailState::AcceptAll => "accept_all",
            EmailState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EmailState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason behind the [`EmailState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubState {
    /// No problems found.
    #[serde(alias = "email_ok")]
    Ok,
    /// Throwaway mailbox provider.
    #[serde(alias = "is_disposable")]
    Disposable,
    /// Role address such as `admin@` or `support@`.
    #[serde(alias = "is_role")]
    Role,
    /// The domain has no usable MX record.
    FailedMxCheck,
    /// Known spam trap.
    FailedSpamTrap,
    /// The mailbox does not exist.
    FailedNoMailbox,
    /// The receiving server greylisted the probe.
    FailedGreylisted,
    /// The address is syntactically invalid.
    FailedSyntaxCheck,
    /// The domain accepts every address.
    AcceptAll,
    /// Anything else.
    #[serde(other)]
    UnknownError,
}

impl SubState {
    /// Canonical name as it appears in payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            SubState::Ok => "ok",
            SubState::Disposable => "disposable",
            SubState::Role => "role",
            SubState::FailedMxCheck => "failed_mx_check",
            SubState::FailedSpamTrap => "failed_spam_trap",
            SubState::FailedNoMailbox => "failed_no_mailbox",
            SubState::FailedGreylisted => "failed_greylisted",
            SubState::FailedSyntaxCheck => "failed_syntax_check",
            SubState::AcceptAll => "accept_all",
            SubState::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for SubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service's verdict for one address.
///
/// Lives for a single request; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// The address that was checked.
    pub email: String,
    /// Primary disposition.
    pub state: EmailState,
    /// Reason for the disposition.
    pub sub_state: SubState,
    /// Corrected address proposed by the service, e.g. `gmail.com` for `gmial.com`.
    pub suggestion: Option<String>,
    /// Domain part as reported by the service.
    #[serde(default)]
    pub domain: Option<String>,
    /// Canonical local part as reported by the service.
    #[serde(default)]
    pub canonical: Option<String>,
    /// MX host the service probed.
    #[serde(default)]
    pub mx_record: Option<String>,
    /// When the service produced the verdict (RFC 3339, as reported).
    #[serde(default)]
    pub verified_at: Option<String>,
}

impl Classification {
    /// Builds a classification with only the decision-relevant fields set.
    pub fn new(email: impl Into<String>, state: EmailState, sub_state: SubState) -> Self {
        Self {
            email: email.into(),
            state,
            sub_state,
            suggestion: None,
            domain: None,
            canonical: None,
            mx_record: None,
            verified_at: None,
        }
    }

    /// Sets the suggested correction.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

//! API key handling.
//!
//! Keys are resolved per invocation: an explicitly configured key wins,
//! otherwise the environment is read again on every call, so rotating the
//! variable takes effect without rebuilding the gate.

use std::fmt;

use crate::error::Error;

/// Environment variable consulted when no key is configured explicitly.
pub const DEFAULT_API_KEY_ENV: &str = "TRUELIST_API_KEY";

/// An API key for the classification service.
///
/// `Debug` and `Display` always print `[REDACTED]`. The raw value is only
/// reachable through [`expose_secret`](Self::expose_secret).
///
/// ```
/// use email_gate::ApiKey;
///
/// let key = ApiKey::new("sk-1234567890");
/// assert_eq!(format!("{key:?}"), "[REDACTED]");
/// assert_eq!(format!("{key}"), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "sk-1234567890");
/// ```
// Do NOT derive Debug, Display or Serialize: they would print the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    inner: String,
}

impl ApiKey {
    /// Wraps a key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Returns the raw key. Keep it out of logs and error messages.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Where an API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    explicit: Option<ApiKey>,
    env_var: String,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self {
            explicit: None,
            env_var: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl CredentialSource {
    /// Creates a source with an explicit key and the default environment fallback.
    pub fn new(explicit: Option<ApiKey>) -> Self {
        Self {
            explicit,
            ..Self::default()
        }
    }

    /// Replaces the environment variable used as fallback.
    #[must_use]
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    /// Returns the environment variable consulted as fallback.
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Resolves the key: explicit value first, then the environment.
    ///
    /// Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when neither source yields a key.
    ///
    /// ```
    /// use email_gate::{ApiKey, CredentialSource};
    ///
    /// let source = CredentialSource::new(Some(ApiKey::new("explicit")));
    /// assert_eq!(source.resolve().unwrap().expose_secret(), "explicit");
    ///
    /// let source = CredentialSource::new(None).with_env_var("EMAIL_GATE_DOCTEST_UNSET");
    /// assert!(source.resolve().is_err());
    /// ```
    pub fn resolve(&self) -> Result<ApiKey, Error> {
        if let Some(key) = self
            .explicit
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
        {
            return Ok(key.clone());
        }

        match std::env::var(&self.env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(ApiKey::new(value)),
            _ => Err(Error::MissingCredential {
                env_var: self.env_var.clone(),
            }),
        }
    }
}

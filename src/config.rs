//! Frozen per-instance settings.
//!
//! A [`GateConfig`] is built once with [`GateConfig::builder`] and then
//! shared read-only (behind an `Arc`) by every invocation of the gate.

use std::time::Duration;

use axum::http::Method;

use crate::classification::EmailState;
use crate::credential::{ApiKey, CredentialSource};
use crate::error::ConfigError;
use crate::policy::RejectionPolicy;

/// Classification service used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.truelist.io";

/// Form field read when none is configured.
pub const DEFAULT_FIELD: &str = "email";

/// Upper bound on one verification call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Largest request body the interception handler will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Immutable gate settings.
#[derive(Debug, Clone)]
pub struct GateConfig {
    paths: Vec<String>,
    methods: Vec<Method>,
    field: String,
    policy: RejectionPolicy,
    credentials: CredentialSource,
    base_url: String,
    timeout: Duration,
    max_body_bytes: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            methods: vec![Method::POST, Method::PUT, Method::PATCH],
            field: DEFAULT_FIELD.to_string(),
            policy: RejectionPolicy::default(),
            credentials: CredentialSource::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GateConfig {
    /// Starts a builder populated with the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use email_gate::{EmailState, GateConfig};
    ///
    /// let config = GateConfig::builder()
    ///     .path("/signup")
    ///     .field("contact_email")
    ///     .reject(EmailState::Risky)
    ///     .timeout_ms(2_500)
    ///     .build()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.field(), "contact_email");
    /// assert_eq!(config.timeout(), Duration::from_millis(2_500));
    /// assert!(config.policy().rejects(EmailState::Invalid));
    /// assert!(config.policy().rejects(EmailState::Risky));
    /// ```
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder {
            config: Self::default(),
            replace_states: None,
        }
    }

    /// Path prefixes the interception handler guards. Empty means every path.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// HTTP methods the interception handler guards.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Body field holding the address.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Rejection policy applied to every classification.
    pub fn policy(&self) -> &RejectionPolicy {
        &self.policy
    }

    /// Where the API key comes from.
    pub fn credentials(&self) -> &CredentialSource {
        &self.credentials
    }

    /// Base URL of the classification service, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upper bound on one verification call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Largest body the interception handler buffers.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Returns `true` if a request with this method and path should be inspected.
    ///
    /// ```
    /// use axum::http::Method;
    /// use email_gate::GateConfig;
    ///
    /// let config = GateConfig::builder().path("/signup").build().unwrap();
    ///
    /// assert!(config.guards(&Method::POST, "/signup"));
    /// assert!(config.guards(&Method::POST, "/signup/team"));
    /// assert!(!config.guards(&Method::GET, "/signup"));
    /// assert!(!config.guards(&Method::POST, "/login"));
    /// ```
    pub fn guards(&self, method: &Method, path: &str) -> bool {
        self.methods.contains(method)
            && (self.paths.is_empty() || self.paths.iter().any(|p| path.starts_with(p.as_str())))
    }
}

/// Builder for [`GateConfig`]. Every setter consumes and returns the builder.
#[derive(Debug, Clone)]
pub struct GateConfigBuilder {
    config: GateConfig,
    // Set by `reject_only`; replaces the default set instead of extending it.
    replace_states: Option<Vec<EmailState>>,
}

impl GateConfigBuilder {
    /// Adds a guarded path prefix.
    #[must_use]
    pub fn path(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.config.paths.contains(&prefix) {
            self.config.paths.push(prefix);
        }
        self
    }

    /// Replaces the guarded path prefixes.
    #[must_use]
    pub fn paths<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.paths.clear();
        prefixes.into_iter().fold(self, |b, p| b.path(p))
    }

    /// Replaces the guarded HTTP methods.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.config.methods = methods.into_iter().collect();
        self
    }

    /// Sets the body field holding the address.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.config.field = field.into();
        self
    }

    /// Adds a state to the default rejection set (`invalid`).
    #[must_use]
    pub fn reject(mut self, state: EmailState) -> Self {
        match self.replace_states.as_mut() {
            Some(states) => states.push(state),
            None => self.config.policy = self.config.policy.reject(state),
        }
        self
    }

    /// Rejects exactly these states, dropping the default.
    #[must_use]
    pub fn reject_only(mut self, states: impl IntoIterator<Item = EmailState>) -> Self {
        self.replace_states = Some(states.into_iter().collect());
        self
    }

    /// Sets the message used in deny payloads.
    #[must_use]
    pub fn deny_message(mut self, message: impl Into<String>) -> Self {
        self.config.policy = self.config.policy.with_message(message);
        self
    }

    /// Configures the API key explicitly instead of reading the environment.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let env_var = self.config.credentials.env_var().to_string();
        self.config.credentials = CredentialSource::new(Some(ApiKey::new(key))).with_env_var(env_var);
        self
    }

    /// Changes the environment variable read when no key is configured.
    #[must_use]
    pub fn api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.config.credentials = self.config.credentials.with_env_var(env_var);
        self
    }

    /// Points the verifier at a different service root.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Bounds each verification call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Bounds each verification call, in milliseconds.
    #[must_use]
    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Caps how much of a request body the interception handler buffers.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty field name, a zero timeout or
    /// body limit, an empty rejection set, or a base URL that is not http(s).
    pub fn build(self) -> Result<GateConfig, ConfigError> {
        let mut config = self.config;

        if let Some(states) = self.replace_states {
            let message = config.policy.message().to_string();
            config.policy = RejectionPolicy::new(states).with_message(message);
        }

        if config.field.trim().is_empty() {
            return Err(ConfigError::EmptyField);
        }
        if config.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if config.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        if config.policy.states().is_empty() {
            return Err(ConfigError::EmptyRejectionSet);
        }
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(config.base_url));
        }

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}

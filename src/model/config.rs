//! GigaChat backend configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The environment is read only when the application calls
//! [`GigaChatConfigBuilder::from_env`]; the backend itself never looks it up.

use std::time::Duration;

use crate::error::ModelError;

/// Default service base URL.
pub const DEFAULT_API_URL: &str = "https://beta.saluteai.sberdevices.ru";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "GigaChat:v1.13.0";
/// Default token endpoint timeout in seconds.
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 3;
/// Default completion timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
/// Upper bound accepted for the sampling temperature.
const MAX_TEMPERATURE: f32 = 2.0;

/// Configuration for [`super::GigaChatModel`].
#[derive(Clone)]
pub struct GigaChatConfig {
    /// Service base URL, without a trailing slash.
    pub api_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Ask the service to filter profanity.
    pub profanity_check: bool,
    /// Sampling temperature. Reported in identifying params only.
    pub temperature: f32,
    /// Pre-obtained bearer token.
    pub token: Option<String>,
    /// Basic-auth user for the token endpoint.
    pub user: Option<String>,
    /// Basic-auth password for the token endpoint.
    pub password: Option<String>,
    /// Log and print outgoing payloads and replies.
    pub verbose: bool,
    /// Token endpoint timeout.
    pub auth_timeout: Duration,
    /// Completion endpoint timeout.
    pub request_timeout: Duration,
}

impl GigaChatConfig {
    /// Creates a new builder for `GigaChatConfig`.
    #[must_use]
    pub fn builder() -> GigaChatConfigBuilder {
        GigaChatConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if a resolved value is rejected.
    pub fn from_env() -> Result<Self, ModelError> {
        Self::builder().from_env().build()
    }
}

impl std::fmt::Debug for GigaChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GigaChatConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("profanity_check", &self.profanity_check)
            .field("temperature", &self.temperature)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("verbose", &self.verbose)
            .field("auth_timeout", &self.auth_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Builder for [`GigaChatConfig`].
#[derive(Debug, Clone, Default)]
pub struct GigaChatConfigBuilder {
    api_url: Option<String>,
    model: Option<String>,
    profanity_check: Option<bool>,
    temperature: Option<f32>,
    token: Option<String>,
    user: Option<String>,
    password: Option<String>,
    verbose: Option<bool>,
    auth_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl GigaChatConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    /// Populates unset fields from an arbitrary key lookup.
    ///
    /// Reads `GIGA_API_URL`, `GIGA_MODEL`, `GIGA_PROFANITY`, `GIGA_TOKEN`,
    /// `GIGA_USER`, `GIGA_PASSWORD` and `GIGA_VERBOSE`. Empty values are ignored.
    #[must_use]
    pub fn from_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_url.is_none() {
            self.api_url = get("GIGA_API_URL");
        }
        if self.model.is_none() {
            self.model = get("GIGA_MODEL");
        }
        if self.profanity_check.is_none() {
            self.profanity_check = get("GIGA_PROFANITY").and_then(|v| parse_flag(&v));
        }
        if self.token.is_none() {
            self.token = get("GIGA_TOKEN");
        }
        if self.user.is_none() {
            self.user = get("GIGA_USER");
        }
        if self.password.is_none() {
            self.password = get("GIGA_PASSWORD");
        }
        if self.verbose.is_none() {
            self.verbose = get("GIGA_VERBOSE").and_then(|v| parse_flag(&v));
        }
        self
    }

    /// Sets the service base URL.
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Enables or disables the profanity filter.
    #[must_use]
    pub const fn profanity_check(mut self, enabled: bool) -> Self {
        self.profanity_check = Some(enabled);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Injects a pre-obtained bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the basic-auth user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the basic-auth password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enables verbose payload logging.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Sets the token endpoint timeout.
    #[must_use]
    pub const fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = Some(timeout);
        self
    }

    /// Sets the completion endpoint timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the [`GigaChatConfig`].
    ///
    /// Credentials are not required here; their absence surfaces as
    /// [`ModelError::MissingCredentials`] when a token is first needed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the URL is not `http(s)` or
    /// the temperature is outside `0.0..=2.0`.
    pub fn build(self) -> Result<GigaChatConfig, ModelError> {
        let api_url = self
            .api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ModelError::InvalidConfig {
                message: format!("api url must start with http:// or https://, got '{api_url}'"),
            });
        }

        let temperature = self.temperature.unwrap_or(0.0);
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(ModelError::InvalidConfig {
                message: format!("temperature must be within 0.0..={MAX_TEMPERATURE}, got {temperature}"),
            });
        }

        Ok(GigaChatConfig {
            api_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            profanity_check: self.profanity_check.unwrap_or(true),
            temperature,
            token: self.token,
            user: self.user,
            password: self.password,
            verbose: self.verbose.unwrap_or(false),
            auth_timeout: self
                .auth_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS)),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_builder_defaults() {
        let config = GigaChatConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.profanity_check);
        assert!(config.temperature.abs() < f32::EPSILON);
        assert!(config.token.is_none());
        assert!(config.user.is_none());
        assert!(!config.verbose);
        assert_eq!(config.auth_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = GigaChatConfig::builder()
            .api_url("http://localhost:8080/")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_url, "http://localhost:8080");
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = GigaChatConfig::builder().api_url("localhost:8080").build();
        assert!(matches!(result, Err(ModelError::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder_rejects_bad_temperature() {
        let result = GigaChatConfig::builder().temperature(3.5).build();
        assert!(matches!(result, Err(ModelError::InvalidConfig { .. })));
    }

    #[test]
    fn test_lookup_fills_unset_fields() {
        let config = GigaChatConfig::builder()
            .from_lookup(lookup(&[
                ("GIGA_USER", "alice"),
                ("GIGA_PASSWORD", "secret"),
                ("GIGA_TOKEN", "tok-1"),
                ("GIGA_PROFANITY", "false"),
                ("GIGA_VERBOSE", "1"),
            ]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.token.as_deref(), Some("tok-1"));
        assert!(!config.profanity_check);
        assert!(config.verbose);
    }

    #[test]
    fn test_explicit_values_win_over_lookup() {
        let config = GigaChatConfig::builder()
            .user("bob")
            .model("GigaChat-Pro")
            .from_lookup(lookup(&[("GIGA_USER", "alice"), ("GIGA_MODEL", "other")]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.user.as_deref(), Some("bob"));
        assert_eq!(config.model, "GigaChat-Pro");
    }

    #[test]
    fn test_lookup_ignores_empty_values() {
        let config = GigaChatConfig::builder()
            .from_lookup(lookup(&[("GIGA_TOKEN", "  ")]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = GigaChatConfig::builder()
            .token("tok-secret")
            .password("pw-secret")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("tok-secret"));
        assert!(!rendered.contains("pw-secret"));
    }
}

//! Transport options and credential resolution.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Primary environment variable holding the generation API key.
pub const GOOGLE_GENERATIVE_AI_API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

/// Fallback environment variable holding the generation API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Errors raised while resolving configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Missing Google Generative AI credentials. Set {primary} or {fallback}.",
        primary = GOOGLE_GENERATIVE_AI_API_KEY_ENV,
        fallback = GEMINI_API_KEY_ENV
    )]
    MissingApiKey,
}

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Resolve the generation API key.
///
/// The key belongs to the upstream generation call only; the enhancer
/// endpoint is called without credentials.
///
/// Looks in `env` first, then in the process environment. Within each
/// source `GOOGLE_GENERATIVE_AI_API_KEY` wins over `GEMINI_API_KEY`.
/// Values are trimmed and blank values ignored.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use streamtext::options::resolve_api_key;
///
/// let env = HashMap::from([("GEMINI_API_KEY".to_string(), " abc ".to_string())]);
/// assert_eq!(resolve_api_key(Some(&env)).unwrap().expose_secret(), "abc");
/// ```
pub fn resolve_api_key(env: Option<&HashMap<String, String>>) -> Result<SecretString, ConfigError> {
    env.and_then(|env| read_key(|name| env.get(name).cloned()))
        .or_else(|| read_key(|name| std::env::var(name).ok()))
        .map(SecretString::new)
        .ok_or(ConfigError::MissingApiKey)
}

fn read_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    [GOOGLE_GENERATIVE_AI_API_KEY_ENV, GEMINI_API_KEY_ENV]
        .into_iter()
        .find_map(|name| normalize(lookup(name)))
}

fn normalize(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Generic transport options containing truly generic transport fields
/// and provider-specific transport configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific transport options type
///
/// # Example
/// ```rust
/// use streamtext::options::{TransportOptions, HttpTransport};
/// use std::time::Duration;
///
/// let options = TransportOptions::new(HttpTransport::default().with_base_url("http://localhost:5173"))
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions<T> {
    /// Request timeout (applies to all transports)
    pub timeout: Option<Duration>,

    /// Provider-specific transport options
    pub provider: T,
}

impl<T> TransportOptions<T> {
    /// Create new transport options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            timeout: None,
            provider,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP-specific transport options.
/// Used as the provider field in `TransportOptions<HttpTransport>`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// Base URL of the enhancer service
    pub base_url: Option<String>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Ignore proxies configured through the environment
    pub no_system_proxy: bool,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Do not pick up proxies from the environment.
    pub fn without_system_proxy(mut self) -> Self {
        self.no_system_proxy = true;
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_primary_key_wins() {
        let pairs = [
            (GEMINI_API_KEY_ENV, "fallback"),
            (GOOGLE_GENERATIVE_AI_API_KEY_ENV, "primary"),
        ];
        assert_eq!(read_key(lookup(&pairs)).as_deref(), Some("primary"));
    }

    #[test]
    fn test_blank_primary_falls_back() {
        let pairs = [
            (GOOGLE_GENERATIVE_AI_API_KEY_ENV, "   "),
            (GEMINI_API_KEY_ENV, "  fallback\n"),
        ];
        assert_eq!(read_key(lookup(&pairs)).as_deref(), Some("fallback"));
    }

    #[test]
    fn test_no_key() {
        assert_eq!(read_key(lookup(&[])), None);
        assert_eq!(read_key(lookup(&[(GEMINI_API_KEY_ENV, "")])), None);
    }

    #[test]
    fn test_explicit_env_is_used_first() {
        let env = HashMap::from([(
            GOOGLE_GENERATIVE_AI_API_KEY_ENV.to_string(),
            "from-map".to_string(),
        )]);
        assert_eq!(resolve_api_key(Some(&env)).unwrap().expose_secret(), "from-map");
    }

    #[test]
    fn test_missing_key_message_names_both_variables() {
        let message = ConfigError::MissingApiKey.to_string();
        assert!(message.contains(GOOGLE_GENERATIVE_AI_API_KEY_ENV));
        assert!(message.contains(GEMINI_API_KEY_ENV));
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::from("sk-123");
        assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
        let env = HashMap::from([(GEMINI_API_KEY_ENV.to_string(), "sk-123".to_string())]);
        let resolved = resolve_api_key(Some(&env)).unwrap();
        assert!(!format!("{resolved:?}").contains("sk-123"));
    }

    #[test]
    fn test_builders() {
        let options = TransportOptions::new(
            HttpTransport::default()
                .with_base_url("http://localhost:5173")
                .without_system_proxy()
                .with_header("x-trace".to_string(), "1".to_string()),
        )
        .with_timeout(Duration::from_secs(5));

        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.provider.base_url.as_deref(), Some("http://localhost:5173"));
        assert!(options.provider.no_system_proxy);
        assert_eq!(
            options.provider.extra_headers.unwrap().get("x-trace").map(String::as_str),
            Some("1")
        );
    }
}

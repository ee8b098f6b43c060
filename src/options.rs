//! Transport configuration for the VibeTune API.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;

/// Environment variable holding the API base URL.
pub const ENV_API_BASE: &str = "VIBETUNE_API_BASE";
/// Environment variable holding the bearer token sent with each request.
pub const ENV_API_KEY: &str = "VIBETUNE_API_KEY";
/// Environment variable holding the request timeout in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "VIBETUNE_TIMEOUT_SECS";

/// Credential that only leaves the crate through [`SecretString::expose_secret`].
///
/// Wraps the bearer token from `VIBETUNE_API_KEY`, the temporary Deepgram
/// key and the realtime `client_secret`. Its `Debug` output is redacted so
/// request and reply structs can be logged as-is.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw credential, for building an `Authorization` header or
    /// handing the key to the speech SDK.
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
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SecretString {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

/// How requests reach the VibeTune handlers.
///
/// # Example
/// ```rust
/// use vibetune::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .with_base_url("https://vibetune.example".to_string())
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request timeout; applies to the whole streamed body as well.
    pub timeout: Option<Duration>,

    /// Base URL the `/api/...` paths are appended to
    pub base_url: Option<String>,

    /// Bearer token for authentication
    pub api_key: Option<SecretString>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Read options from `VIBETUNE_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary variable lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    ClientError::Config(format!(
                        "{ENV_TIMEOUT_SECS} must be a number of seconds, got {raw:?}"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            timeout,
            base_url: get(ENV_API_BASE),
            api_key: get(ENV_API_KEY).map(SecretString::new),
            ..Self::default()
        })
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
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

//! Client configuration.

use crate::error::AemetError;
use crate::normalize::date_chunks::DEFAULT_MAX_SPAN_YEARS;
use bon::Builder;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://opendata.aemet.es/opendata/api/";
/// Environment variable read by [`ClientConfig::from_env`].
pub const API_KEY_ENV: &str = "AEMET_API_KEY";

/// Settings shared by every remote call.
///
/// # Examples
///
/// ```
/// use aemet_clima::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .api_key("my-key")
///     .rate_limit_cooldown(Duration::from_secs(35))
///     .max_attempts(3)
///     .build();
/// assert_eq!(config.max_span_years, 4);
/// ```
#[derive(Clone, Builder)]
pub struct ClientConfig {
    /// AEMET OpenData API key, sent as the `api_key` query parameter.
    #[builder(into)]
    pub api_key: String,

    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,

    /// Pause before retrying a rate-limited (429) request.
    #[builder(default = Duration::from_secs(50))]
    pub rate_limit_cooldown: Duration,

    /// Total attempts per request, the first one included.
    #[builder(default = 5)]
    pub max_attempts: u32,

    /// Per-request timeout of the default HTTP transport.
    #[builder(default = Duration::from_secs(60))]
    pub timeout: Duration,

    /// Largest window, in years, requested from the daily climatology endpoint.
    #[builder(default = DEFAULT_MAX_SPAN_YEARS)]
    pub max_span_years: u32,
}

impl ClientConfig {
    /// Default configuration for the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// Default configuration with the key taken from `AEMET_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`AemetError::Config`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self, AemetError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(AemetError::Config(format!("{} is not set", API_KEY_ENV))),
        }
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("rate_limit_cooldown", &self.rate_limit_cooldown)
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .field("max_span_years", &self.max_span_years)
            .finish()
    }
}

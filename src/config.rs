//! Client configuration loaded from environment variables.
//!
//! Connection details **must** be provided via environment variables:
//! - `SEAMLESS_WALLET_BASE_URL` - base URL of the ledger service
//! - `SEAMLESS_WALLET_USERNAME` - basic auth username
//! - `SEAMLESS_WALLET_PASSWORD` - basic auth password
//!
//! Optional tuning of the synchronous delivery path:
//! - `SEAMLESS_WALLET_CLIENT_MAXIMUM_NUMBER_OF_RETRIES` (default 3)
//! - `SEAMLESS_WALLET_CLIENT_RETRY_DELAY_MS` (default 1000)
//! - `SEAMLESS_WALLET_CLIENT_TIMEOUT_MS` (default 1000)

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::transport::sync::RetryPolicy;

const BASE_URL_VAR: &str = "SEAMLESS_WALLET_BASE_URL";
const USERNAME_VAR: &str = "SEAMLESS_WALLET_USERNAME";
const PASSWORD_VAR: &str = "SEAMLESS_WALLET_PASSWORD";
const MAX_ATTEMPTS_VAR: &str = "SEAMLESS_WALLET_CLIENT_MAXIMUM_NUMBER_OF_RETRIES";
const RETRY_DELAY_VAR: &str = "SEAMLESS_WALLET_CLIENT_RETRY_DELAY_MS";
const TIMEOUT_VAR: &str = "SEAMLESS_WALLET_CLIENT_TIMEOUT_MS";

/// Connection settings for one ledger service.
#[derive(Clone)]
pub struct WalletConfig {
    pub base_url: String,
    pub username: String,
    pub password: Zeroizing<String>,
    pub retry: RetryPolicy,
}

impl WalletConfig {
    /// Creates a configuration with the default retry policy.
    ///
    /// A trailing `/` on `base_url` is dropped so endpoint paths can be
    /// appended directly.
    #[must_use]
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the invariants a client relies on.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`](crate::WalletError::Config) if the
    /// base URL, username or password is empty, or the retry policy allows
    /// no attempt at all.
    pub fn validate(&self) -> crate::Result<()> {
        if self.base_url.is_empty() || self.username.is_empty() || self.password.is_empty() {
            return Err(crate::WalletError::Config(
                "base url, username, and password cannot be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(crate::WalletError::Config(
                "maximum number of attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.timeout.is_zero() {
            return Err(crate::WalletError::Config(
                "per-attempt timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

/// Loads the client configuration from environment variables.
///
/// # Errors
///
/// Returns [`WalletError::Config`](crate::WalletError::Config) if a required
/// variable is missing or a numeric variable does not parse.
pub fn fetch_config() -> crate::Result<WalletConfig> {
    let base_url = required_var(BASE_URL_VAR)?;
    let username = required_var(USERNAME_VAR)?;
    let password = Zeroizing::new(required_var(PASSWORD_VAR)?);

    let defaults = RetryPolicy::default();
    let retry = RetryPolicy {
        max_attempts: parsed_var(MAX_ATTEMPTS_VAR)?.unwrap_or(defaults.max_attempts),
        delay: parsed_var(RETRY_DELAY_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay),
        timeout: parsed_var(TIMEOUT_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout),
    };

    let config = WalletConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        username,
        password,
        retry,
    };
    config.validate()?;

    Ok(config)
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn required_var(name: &str) -> crate::Result<String> {
    non_empty_var(name)
        .ok_or_else(|| crate::WalletError::Config(format!("{name} is not set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> crate::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| crate::WalletError::Config(format!("{name}={raw:?} is invalid: {e}")))
        })
        .transpose()
}

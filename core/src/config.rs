use std::{fmt, time::Duration};

use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Environment variable `{0}` is not set")]
    MissingCredential(String),
    #[error("Environment variable `{0}` is empty")]
    EmptyCredential(String),
    #[error("Invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),
}

/// Secret used to authenticate against a provider.
///
/// Loaded once when the provider is constructed and never mutated afterwards.
/// The `Debug` impl never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigurationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigurationError::EmptyCredential("<inline>".to_string()));
        }
        Ok(Self(key))
    }

    /// Reads the key from the environment variable `var`
    pub fn from_env(var: &str) -> Result<Self, ConfigurationError> {
        let key = std::env::var(var)
            .map_err(|_| ConfigurationError::MissingCredential(var.to_string()))?;
        if key.trim().is_empty() {
            return Err(ConfigurationError::EmptyCredential(var.to_string()));
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Backoff schedule for transient provider failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    /// Growth factor between retries, at least 1
    #[serde(deserialize_with = "growth_factor")]
    pub multiplier: f64,
    #[serde(with = "millis")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        // overflowing, negative and NaN delays all fall back to the cap
        Duration::try_from_secs_f64(delay).map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

fn growth_factor<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let multiplier = f64::deserialize(d)?;
    if multiplier.is_finite() && multiplier >= 1.0 {
        Ok(multiplier)
    } else {
        Err(de::Error::custom(format!(
            "multiplier must be a finite number of at least 1, got {multiplier}"
        )))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-ant-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(<redacted>)");
        assert_eq!(key.expose(), "sk-ant-secret");
    }

    #[test]
    fn test_missing_and_empty_credentials() {
        let var = "ORDERLY_TEST_SURELY_UNSET_KEY";
        assert!(matches!(
            ApiKey::from_env(var),
            Err(ConfigurationError::MissingCredential(v)) if v == var
        ));
        assert!(matches!(
            ApiKey::new("   "),
            Err(ConfigurationError::EmptyCredential(_))
        ));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_policy_from_json() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts": 5, "initial_backoff": 10}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(10));
        assert_eq!(policy.max_backoff, Duration::from_secs(8));
        assert!(serde_json::from_str::<RetryPolicy>(r#"{"retries": 1}"#).is_err());
        assert!(serde_json::from_str::<RetryPolicy>(r#"{"multiplier": -2.0}"#).is_err());
        assert!(serde_json::from_str::<RetryPolicy>(r#"{"multiplier": 0.5}"#).is_err());
    }

    #[test]
    fn test_backoff_never_overflows() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 100}"#).unwrap();
        assert_eq!(policy.backoff(70), Duration::from_secs(8));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(8));

        let shrinking = RetryPolicy {
            multiplier: -2.0,
            ..RetryPolicy::default()
        };
        assert_eq!(shrinking.backoff(2), Duration::from_secs(8));
        let nan = RetryPolicy {
            multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(nan.backoff(3), Duration::from_secs(8));
    }
}

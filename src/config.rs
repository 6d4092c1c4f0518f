use std::env;
use std::time::Duration;

use crate::history::HISTORY_LIMIT;
use crate::retry::RetryPolicy;

/// Wall-clock ceiling for one generation, matching the original runtime's
/// 3-minute abort timer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Hard upper bound on one generation; fires the same abort mechanism
    /// as manual cancellation.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults with environment overrides:
    /// `FLOWFORGE_TIMEOUT_SECS`, `FLOWFORGE_RETRY_ATTEMPTS`.
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("FLOWFORGE_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.request_timeout = Duration::from_secs(secs);
                }
                _ => tracing::warn!(
                    value = %raw,
                    "invalid FLOWFORGE_TIMEOUT_SECS, keeping default"
                ),
            }
        }

        if let Ok(raw) = env::var("FLOWFORGE_RETRY_ATTEMPTS") {
            match raw.parse::<u32>() {
                Ok(attempts) if attempts > 0 => {
                    config.retry.max_attempts = attempts;
                }
                _ => tracing::warn!(
                    value = %raw,
                    "invalid FLOWFORGE_RETRY_ATTEMPTS, keeping default"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns both variables; splitting it would race the process
    // environment across parallel tests.
    #[test]
    fn from_env_applies_valid_overrides_and_ignores_bad_ones() {
        unsafe {
            env::set_var("FLOWFORGE_TIMEOUT_SECS", "not-a-number");
            env::set_var("FLOWFORGE_RETRY_ATTEMPTS", "0");
        }
        let config = OrchestratorConfig::from_env();
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            config.retry.max_attempts,
            RetryPolicy::default().max_attempts
        );

        unsafe {
            env::set_var("FLOWFORGE_TIMEOUT_SECS", "240");
            env::set_var("FLOWFORGE_RETRY_ATTEMPTS", "5");
        }
        let config = OrchestratorConfig::from_env();
        assert_eq!(config.request_timeout, Duration::from_secs(240));
        assert_eq!(config.retry.max_attempts, 5);

        unsafe {
            env::remove_var("FLOWFORGE_TIMEOUT_SECS");
            env::remove_var("FLOWFORGE_RETRY_ATTEMPTS");
        }
        let config = OrchestratorConfig::from_env();
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}

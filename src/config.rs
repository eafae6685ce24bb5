//! Runtime settings for the acquirer simulation and the background workers.

use std::time::Duration;

/// Settings shared by the acquirer and every background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How often the timeout reaper scans for stale challenges.
    pub timeout_interval: Duration,
    /// How often the refund sweeper scans confirmed payments.
    pub refund_interval: Duration,
    /// How often the gateway re-runs the saga over all of its payments.
    pub resync_interval: Duration,
    /// Age after which an unanswered challenge is cancelled.
    pub challenge_ttl: Duration,
    /// Token every simulated 3-D Secure challenge expects back.
    pub expected_challenge_response: String,
    /// Prefix of the challenge URL handed to the customer.
    pub challenge_url_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_interval: Duration::from_secs(10),
            refund_interval: Duration::from_secs(10),
            resync_interval: Duration::from_secs(5),
            challenge_ttl: Duration::from_secs(60),
            expected_challenge_response: "123456".to_string(),
            challenge_url_base: "https://example.com/3ds/".to_string(),
        }
    }
}

impl Config {
    pub fn challenge_url(&self) -> String {
        format!(
            "{}{}",
            self.challenge_url_base, self.expected_challenge_response
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.timeout_interval, Duration::from_secs(10));
        assert_eq!(config.refund_interval, Duration::from_secs(10));
        assert_eq!(config.challenge_ttl, Duration::from_secs(60));
    }

    #[test]
    fn challenge_url_ends_with_expected_response() {
        let config = Config::default();
        assert_eq!(config.challenge_url(), "https://example.com/3ds/123456");
    }
}

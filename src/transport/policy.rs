use std::time::Duration;

use crate::config::ReconnectConfig;

/// Fixed-delay reconnect policy with an optional attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// A dial still pending after this long counts as a failed attempt.
    pub dial_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            max_attempts: Some(5),
            dial_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(cfg: &ReconnectConfig) -> Self {
        Self {
            delay: cfg.delay(),
            max_attempts: cfg.max_attempts,
            dial_timeout: cfg.dial_timeout(),
        }
    }
}

impl ReconnectPolicy {
    pub fn describe(&self) -> String {
        match self.max_attempts {
            Some(n) => format!("every {} ms, at most {n} attempts", self.delay.as_millis()),
            None => format!("every {} ms, unbounded", self.delay.as_millis()),
        }
    }
}

/// Attempts used against a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Claim the next attempt: its number and delay, or `None` once exhausted.
    pub fn next_attempt(&mut self) -> Option<(u32, Duration)> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }
        self.attempts = self.attempts.saturating_add(1);
        Some((self.attempts, self.policy.delay))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

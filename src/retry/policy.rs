//! Retry policy with configurable backoff

use crate::error::{Error, TransportErrorKind};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Status codes a policy retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusRule {
    /// A whole class, e.g. `Class(5)` for 5xx
    Class(u16),
    /// One exact status code
    Code(u16),
}

impl StatusRule {
    /// The 5xx class
    pub const SERVER_ERRORS: StatusRule = StatusRule::Class(5);

    /// Check if a status matches this rule
    pub fn matches(self, status: u16) -> bool {
        match self {
            StatusRule::Class(class) => status / 100 == class,
            StatusRule::Code(code) => status == code,
        }
    }
}

impl FromStr for StatusRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(class) = s.strip_suffix("xx").or_else(|| s.strip_suffix("XX")) {
            return match class.parse::<u16>() {
                Ok(c @ 1..=5) => Ok(StatusRule::Class(c)),
                _ => Err(format!("Invalid status class: {s}")),
            };
        }
        match s.parse::<u16>() {
            Ok(code @ 100..=599) => Ok(StatusRule::Code(code)),
            _ => Err(format!("Invalid status code: {s}")),
        }
    }
}

impl TryFrom<String> for StatusRule {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatusRule> for String {
    fn from(rule: StatusRule) -> Self {
        match rule {
            StatusRule::Class(class) => format!("{class}xx"),
            StatusRule::Code(code) => code.to_string(),
        }
    }
}

/// Outcome of consulting a retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay
    Retry(Duration),
    /// Surface the error
    GiveUp,
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry(_))
    }
}

/// Retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the original try; total tries ≤ `max_retry_count + 1`
    pub max_retry_count: u32,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any delay
    pub max_backoff: Duration,
    /// Status codes considered retryable
    pub retry_on: Vec<StatusRule>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            retry_on: vec![StatusRule::SERVER_ERRORS],
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff
    pub fn new(max_retry_count: u32) -> Self {
        Self {
            max_retry_count,
            ..Self::default()
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Replace the retryable status rules
    #[must_use]
    pub fn with_statuses(mut self, rules: Vec<StatusRule>) -> Self {
        self.retry_on = rules;
        self
    }

    /// Check if an error is one this policy retries
    pub fn is_retryable(&self, error: &Error) -> bool {
        match error {
            Error::Transport { kind, .. } => {
                matches!(kind, TransportErrorKind::Timeout | TransportErrorKind::Connect)
            }
            Error::HttpStatus { status, .. } => {
                error.is_retryable() && self.retry_on.iter().any(|rule| rule.matches(*status))
            }
            _ => false,
        }
    }

    /// Decide what to do after attempt `attempt` (starting at 1) failed
    pub fn should_retry(&self, attempt: u32, error: &Error) -> RetryDecision {
        if attempt == 0 || attempt > self.max_retry_count || !self.is_retryable(error) {
            return RetryDecision::GiveUp;
        }

        let delay = match error {
            Error::HttpStatus {
                retry_after: Some(wait),
                ..
            } => std::cmp::min(*wait, self.max_backoff),
            _ => self.calculate_backoff(attempt),
        };
        RetryDecision::Retry(delay)
    }

    /// Calculate backoff delay before the retry that follows `attempt`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(step.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(step);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

//! Retry policy values shared by every polling loop.

use std::time::Duration;

/// Delay applied once after the instance reports active, to absorb
/// address propagation lag.
pub const SETTLE_DELAY: Duration = Duration::from_secs(30);

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// Waiting for a fresh droplet to become active.
    pub const INSTANCE_ACTIVE: Self = Self::new(30, Duration::from_secs(5));
    /// Waiting for the agent's control API to accept connections.
    pub const AGENT_LIVENESS: Self = Self::new(12, Duration::from_secs(5));
    /// Consecutive failed or empty status polls tolerated while monitoring.
    pub const MONITOR: Self = Self::new(12, Duration::from_secs(5));

    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Same attempt budget with a different interval.
    #[must_use]
    pub const fn with_interval(self, interval: Duration) -> Self {
        Self::new(self.max_attempts, interval)
    }

    #[must_use]
    pub fn budget(self) -> RetryBudget {
        RetryBudget {
            policy: self,
            failures: 0,
        }
    }
}

/// Verdict after recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    /// Retry after `interval`.
    Retry,
    /// The policy's attempt ceiling was reached.
    Exhausted,
}

/// Counter of consecutive failed attempts under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryBudget {
    /// Record one failed attempt.
    pub fn fail(&mut self) -> BudgetState {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_attempts {
            BudgetState::Exhausted
        } else {
            BudgetState::Retry
        }
    }

    /// Forget previous failures.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

//! Reconnect policy and per-streak budget.
//!
//! The budget counts consecutive unexpected closes. Each close while below
//! the limit increments the count and yields `base * 2^attempts`, so the
//! default policy waits 2s, 4s, 8s, 16s and 32s before giving up. A
//! successful open resets the count.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default number of reconnect attempts per failure streak.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay multiplied by `2^attempts`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed per failure streak.
    pub max_attempts: u32,
    /// Delay unit.
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy.
    #[inline]
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

// ============================================================================
// ReconnectBudget
// ============================================================================

/// Attempt counter for one failure streak.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectBudget {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ReconnectBudget {
    /// Creates an unspent budget.
    #[inline]
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Attempts made in the current streak.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Returns `true` once no attempts remain.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Resets the streak after a successful open.
    #[inline]
    pub fn on_opened(&mut self) {
        self.attempts = 0;
    }

    /// Spends one attempt for an unexpected close.
    ///
    /// Returns the delay before reconnecting, or `None` once exhausted. The
    /// counter is frozen after exhaustion.
    pub fn on_closed(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for(self.attempts))
    }
}

// ============================================================================
// Tests
// ============================================================================

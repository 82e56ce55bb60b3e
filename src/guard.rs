//! Single-flight guard.
//!
//! A [`FlightGuard`] owns a boolean flag for as long as it lives. A second
//! acquisition attempt while the flag is held fails instead of waiting, and
//! the flag is released on drop, including during unwinding.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// FlightGuard
// ============================================================================

/// Scoped hold on a single-flight flag.
#[derive(Debug)]
#[must_use = "the flag is released as soon as the guard is dropped"]
pub(crate) struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    /// Takes the flag, or returns `None` if it is already held.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================

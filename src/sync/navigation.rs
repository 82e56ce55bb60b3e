//! Navigation boundary.
//!
//! The "current location" is the page fragment the user is looking at.
//! User navigation pushes a history entry and notifies listeners; the
//! synchronizer writes back with [`Navigator::replace_location`], which
//! neither pushes history nor notifies, so server echoes cannot loop.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

// ============================================================================
// Types
// ============================================================================

/// Callback fired when the user navigates.
pub type NavigationListener = Box<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Navigator
// ============================================================================

/// Current-location store with change notifications.
pub trait Navigator: Send + Sync {
    /// Returns the current location (empty when none).
    fn location(&self) -> String;

    /// Overwrites the location without a history entry or notification.
    fn replace_location(&self, location: &str);

    /// Registers a change listener.
    fn subscribe(&self, listener: NavigationListener);
}

// ============================================================================
// MemoryNavigator
// ============================================================================

/// In-memory [`Navigator`].
///
/// Keeps a history stack so callers can tell pushes from replacements.
#[derive(Default)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
    listeners: RwLock<Vec<NavigationListener>>,
}

impl fmt::Debug for MemoryNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNavigator")
            .field("history", &*self.history.lock())
            .finish_non_exhaustive()
    }
}

impl MemoryNavigator {
    /// Creates a navigator with an empty location.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a navigator starting at `location`.
    #[must_use]
    pub fn with_location(location: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![location.into()]),
            listeners: RwLock::default(),
        }
    }

    /// Navigates as a user would: push a history entry, then notify.
    pub fn navigate(&self, location: &str) {
        self.history.lock().push(location.to_string());
        trace!(location, "Navigated");

        for listener in self.listeners.read().iter() {
            listener(location);
        }
    }

    /// Returns the number of history entries.
    #[inline]
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

impl Navigator for MemoryNavigator {
    fn location(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_default()
    }

    fn replace_location(&self, location: &str) {
        let mut history = self.history.lock();
        match history.last_mut() {
            Some(last) => *last = location.to_string(),
            None => history.push(location.to_string()),
        }
        trace!(location, "Location replaced");
    }

    fn subscribe(&self, listener: NavigationListener) {
        self.listeners.write().push(listener);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_location() {
        assert_eq!(MemoryNavigator::new().location(), "");
    }

    #[test]
    fn test_navigate_pushes_and_notifies() {
        let navigator = MemoryNavigator::with_location("home");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        navigator.subscribe(Box::new(move |location| {
            assert_eq!(location, "dashboard");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        navigator.navigate("dashboard");

        assert_eq!(navigator.location(), "dashboard");
        assert_eq!(navigator.history_len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replace_is_silent() {
        let navigator = MemoryNavigator::with_location("home");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        navigator.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        navigator.replace_location("settings");

        assert_eq!(navigator.location(), "settings");
        assert_eq!(navigator.history_len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_replace_on_empty_history() {
        let navigator = MemoryNavigator::new();
        navigator.replace_location("home");
        assert_eq!(navigator.location(), "home");
        assert_eq!(navigator.history_len(), 1);
    }
}

//! Navigation hook: how the managers move the user around.
//!
//! The core never draws anything, but some operations end in a route
//! change (sign-out lands on the sign-in page, a tenant switch lands on
//! that tenant's dashboard). The application supplies a [`Navigator`]
//! that performs the move in whatever UI it runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Performs route changes on behalf of the managers.
pub trait Navigator: Send + Sync + 'static {
    /// In-application route change. Guards run for the destination.
    fn push(&self, path: &str);

    /// Full-page navigation, e.g. to the identity provider. The
    /// application is left; no in-process state change follows.
    fn assign(&self, url: &str);
}

/// A single recorded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Push(String),
    Assign(String),
}

impl Navigation {
    pub fn target(&self) -> &str {
        match self {
            Self::Push(t) | Self::Assign(t) => t,
        }
    }
}

/// A [`Navigator`] that records every navigation in order.
///
/// Headless hosts (the CLI walkthrough, tests) use it to observe where
/// the managers tried to send the user.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<Navigation>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Navigation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<Navigation> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.lock().last().cloned()
    }

    /// Returns `true` if any recorded navigation went to `target`.
    pub fn visited(&self, target: &str) -> bool {
        self.lock().iter().any(|n| n.target() == target)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.lock().push(Navigation::Push(path.to_string()));
    }

    fn assign(&self, url: &str) {
        tracing::debug!(url, "navigate (full page)");
        self.lock().push(Navigation::Assign(url.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_records_in_order() {
        let nav = HistoryNavigator::new();

        nav.push("/dashboard");
        nav.assign("https://idp.test/authorize");

        assert_eq!(
            nav.entries(),
            vec![
                Navigation::Push("/dashboard".into()),
                Navigation::Assign("https://idp.test/authorize".into()),
            ]
        );
        assert!(nav.visited("/dashboard"));
        assert_eq!(nav.last().unwrap().target(), "https://idp.test/authorize");
    }

    #[test]
    fn test_clear_empties_history() {
        let nav = HistoryNavigator::new();
        nav.push("/login");

        nav.clear();

        assert!(nav.entries().is_empty());
        assert_eq!(nav.last(), None);
    }
}

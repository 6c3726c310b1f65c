//! # Connectivity Oracle
//!
//! Answers one question before any network activity: are we online?
//!
//! The answer is synchronous and infallible. When the platform cannot tell,
//! implementations report the last known value (or `false`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Network reachability as seen by the platform layer.
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Always reports connected. Useful for daemons on wired hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_connected(&self) -> bool {
        true
    }
}

/// Shared flag flipped by whatever observes the network.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    connected: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    pub fn new(connected: bool) -> Self {
        ConnectivityFlag {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    /// Records the latest observation.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl<F> Connectivity for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_connected(&self) -> bool {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = ConnectivityFlag::default();
        let observer = flag.clone();
        assert!(!observer.is_connected());

        flag.set_connected(true);
        assert!(observer.is_connected());
    }

    #[test]
    fn test_closure_oracle() {
        let oracle: Arc<dyn Connectivity> = Arc::new(|| false);
        assert!(!oracle.is_connected());
        assert!(AlwaysOnline.is_connected());
    }
}

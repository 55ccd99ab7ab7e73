//! Delayed release of idle assets.
//!
//! When the last voice using a sound finishes, the sound is not unloaded
//! right away: it is marked free and only released after it has stayed
//! idle for longer than the timeout. Playing it again in the meantime
//! cancels the pending release, so bursts of the same effect do not
//! thrash the loader.
//!
//! The reaper keys everything by catalog name and never touches the
//! loader itself; expired names are handed back to the caller.

use tracing::{debug, trace};

/// Default idle time before an asset is released, in seconds.
pub const DEFAULT_FREE_TIMEOUT_SECS: f32 = 120.0;

/// A name waiting to be released.
#[derive(Debug, Clone, PartialEq)]
struct PendingRelease {
    name: String,
    idle_seconds: f32,
}

/// Tracks idle assets and expires them after a timeout.
#[derive(Debug, Clone)]
pub struct FreeAssetReaper {
    /// Pending releases in the order they were marked free.
    pending: Vec<PendingRelease>,
    /// Idle seconds after which a name expires.
    timeout: f32,
}

impl Default for FreeAssetReaper {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_TIMEOUT_SECS)
    }
}

impl FreeAssetReaper {
    /// Create a reaper with the given timeout in seconds.
    #[must_use]
    pub fn new(timeout_secs: f32) -> Self {
        Self {
            pending: Vec::new(),
            timeout: timeout_secs.max(0.0),
        }
    }

    /// Idle seconds after which a name expires.
    #[must_use]
    pub fn timeout(&self) -> f32 {
        self.timeout
    }

    /// Starts the idle timer for `name`. Already pending names keep their
    /// accumulated time.
    pub fn mark_free(&mut self, name: &str) {
        if self.is_pending(name) {
            return;
        }
        trace!("Asset '{}' marked free", name);
        self.pending.push(PendingRelease {
            name: name.to_string(),
            idle_seconds: 0.0,
        });
    }

    /// Cancels a pending release. No-op if `name` is not pending.
    pub fn mark_in_use(&mut self, name: &str) {
        let before = self.pending.len();
        self.pending.retain(|p| p.name != name);
        if self.pending.len() != before {
            trace!("Asset '{}' back in use", name);
        }
    }

    /// Whether `name` is waiting to be released.
    #[must_use]
    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|p| p.name == name)
    }

    /// Idle seconds accumulated by `name`, if pending.
    #[must_use]
    pub fn idle_seconds(&self, name: &str) -> Option<f32> {
        self.pending
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.idle_seconds)
    }

    /// Number of pending releases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Ages every pending name by `delta` seconds and expires those idle for
    /// longer than the timeout.
    ///
    /// `on_expire` runs once per expired name, in the order the names were
    /// marked free, after they have been removed from the pending set.
    pub fn tick(&mut self, delta: f32, mut on_expire: impl FnMut(&str)) {
        if self.pending.is_empty() {
            return;
        }

        let delta = delta.max(0.0);
        let timeout = self.timeout;
        let mut expired = Vec::new();

        self.pending.retain_mut(|p| {
            p.idle_seconds += delta;
            if p.idle_seconds > timeout {
                expired.push(std::mem::take(&mut p.name));
                false
            } else {
                true
            }
        });

        for name in &expired {
            debug!("Releasing idle asset '{}'", name);
            on_expire(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn expire(reaper: &mut FreeAssetReaper, delta: f32) -> Vec<String> {
        let mut out = Vec::new();
        reaper.tick(delta, |name| out.push(name.to_string()));
        out
    }

    #[test]
    fn test_expires_only_after_timeout() {
        let mut reaper = FreeAssetReaper::new(120.0);
        reaper.mark_free("explosion");

        assert!(expire(&mut reaper, 119.0).is_empty());
        assert_eq!(expire(&mut reaper, 2.0), vec!["explosion"]);
        assert!(reaper.is_empty());
    }

    #[test]
    fn test_exact_timeout_does_not_expire() {
        let mut reaper = FreeAssetReaper::new(2.0);
        reaper.mark_free("a");

        assert!(expire(&mut reaper, 2.0).is_empty());
        assert_eq!(expire(&mut reaper, 0.001), vec!["a"]);
    }

    #[test]
    fn test_mark_in_use_cancels_release() {
        let mut reaper = FreeAssetReaper::new(120.0);
        reaper.mark_free("explosion");
        expire(&mut reaper, 100.0);
        reaper.mark_in_use("explosion");

        assert!(expire(&mut reaper, 200.0).is_empty());
        assert!(!reaper.is_pending("explosion"));
    }

    #[test]
    fn test_mark_free_is_idempotent() {
        let mut reaper = FreeAssetReaper::new(10.0);
        reaper.mark_free("a");
        expire(&mut reaper, 6.0);
        reaper.mark_free("a");

        assert_eq!(reaper.len(), 1);
        assert_eq!(reaper.idle_seconds("a"), Some(6.0));
        assert_eq!(expire(&mut reaper, 5.0), vec!["a"]);
    }

    #[test]
    fn test_mark_in_use_unknown_is_noop() {
        let mut reaper = FreeAssetReaper::default();
        reaper.mark_in_use("ghost");
        assert!(reaper.is_empty());
        assert_eq!(reaper.timeout(), DEFAULT_FREE_TIMEOUT_SECS);
    }

    #[test]
    fn test_expiry_order_follows_mark_order() {
        let mut reaper = FreeAssetReaper::new(1.0);
        reaper.mark_free("c");
        reaper.mark_free("a");
        reaper.mark_free("b");

        assert_eq!(expire(&mut reaper, 1.5), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_callback_may_mark_more_names_afterwards() {
        let mut reaper = FreeAssetReaper::new(1.0);
        reaper.mark_free("a");
        reaper.mark_free("b");

        let expired = expire(&mut reaper, 2.0);
        for name in &expired {
            reaper.mark_free(&format!("{name}-next"));
        }

        assert_eq!(expired.len(), 2);
        assert_eq!(reaper.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_each_name_expires_at_most_once(
            deltas in proptest::collection::vec(0.0f32..5.0, 1..40),
        ) {
            let mut reaper = FreeAssetReaper::new(3.0);
            reaper.mark_free("x");
            reaper.mark_free("y");

            let mut seen = Vec::new();
            for delta in deltas {
                reaper.tick(delta, |name| seen.push(name.to_string()));
            }

            let xs = seen.iter().filter(|n| *n == "x").count();
            let ys = seen.iter().filter(|n| *n == "y").count();
            prop_assert!(xs <= 1 && ys <= 1);
            prop_assert_eq!(xs, ys);
        }
    }
}

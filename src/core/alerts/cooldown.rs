// Cooldown filter - drops redelivered raw events before they reach the engine.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Timed set of recently admitted event keys.
pub struct CooldownFilter {
    window: Duration,
    /// Expiry instant per admitted key
    entries: HashMap<String, Instant>,
}

impl CooldownFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    /// Returns true when `key` should be forwarded. Admitting a key starts
    /// (or refreshes) its cooldown window.
    pub fn observe(&mut self, key: &str, now: Instant) -> bool {
        if let Some(expiry) = self.entries.get(key) {
            if now < *expiry {
                return false;
            }
        }
        self.entries.insert(key.to_string(), now + self.window);
        true
    }

    /// Drop every entry whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| now < *expiry);
        before - self.entries.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_window() {
        let mut filter = CooldownFilter::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(filter.observe("K", t0));
        assert!(!filter.observe("K", t0 + Duration::from_secs(30)));
        assert!(!filter.observe("K", t0 + Duration::from_millis(59_999)));
        assert!(filter.observe("K", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_keys_expire_independently() {
        let mut filter = CooldownFilter::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(filter.observe("A", t0));
        assert!(filter.observe("B", t0 + Duration::from_secs(40)));

        let t1 = t0 + Duration::from_secs(70);
        assert!(!filter.observe("B", t1), "B is still cooling down");
        assert!(filter.observe("A", t1));
    }

    #[test]
    fn test_purge_expired() {
        let mut filter = CooldownFilter::new(Duration::from_secs(60));
        let t0 = Instant::now();
        filter.observe("A", t0);
        filter.observe("B", t0 + Duration::from_secs(30));

        assert_eq!(filter.purge_expired(t0 + Duration::from_secs(61)), 1);
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.purge_expired(t0 + Duration::from_secs(90)), 1);
        assert!(filter.is_empty());
    }
}

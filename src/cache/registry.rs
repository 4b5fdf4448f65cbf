//! Process-wide record of keys this instance has written.
//!
//! The registry lets pattern invalidation find keys without asking the distributed store. It
//! only knows about keys written *by this process*; keys written by other instances are found
//! through the store's own scan.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::keys::matches_pattern;

/// Concurrent map of fully-qualified key to the time it was last written.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    entries: DashMap<String, DateTime<Utc>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` as written now. Re-tracking overwrites the timestamp.
    pub fn track(&self, key: &str) {
        self.entries.insert(key.to_string(), Utc::now());
    }

    /// Forgets `key`. Returns `true` if it was tracked.
    pub fn untrack(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn tracked_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Point-in-time copy of the tracked keys, in no particular order.
    ///
    /// Concurrent writers may add or remove keys while the copy is taken; each key appears at
    /// most once.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Every tracked key with its write time, sorted by key.
    pub fn entries(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Tracked keys matching `pattern`.
    pub fn matching(&self, pattern: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| matches_pattern(entry.key(), pattern))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_track_and_untrack() {
        let registry = KeyRegistry::new();
        assert!(registry.is_empty());

        registry.track("p:entity:id:A");
        assert!(registry.contains("p:entity:id:A"));
        assert_eq!(registry.len(), 1);

        assert!(registry.untrack("p:entity:id:A"));
        assert!(!registry.untrack("p:entity:id:A"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_retrack_overwrites_timestamp() {
        let registry = KeyRegistry::new();
        registry.track("k");
        let first = registry.tracked_at("k").expect("tracked");

        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.track("k");
        let second = registry.tracked_at("k").expect("tracked");

        assert_eq!(registry.len(), 1);
        assert!(second >= first);
    }

    #[test]
    fn test_matching_uses_prefix_semantics() {
        let registry = KeyRegistry::new();
        registry.track("p:entity:list:1:10:name:asc");
        registry.track("p:entity:list:2:10:name:asc");
        registry.track("p:entity:search:abc");
        registry.track("p:entity:id:A");

        let mut lists = registry.matching("p:entity:list:*");
        lists.sort();
        assert_eq!(
            lists,
            vec!["p:entity:list:1:10:name:asc", "p:entity:list:2:10:name:asc"]
        );
        assert_eq!(registry.matching("p:entity:*").len(), 4);
        assert_eq!(registry.matching("p:entity:id:A"), vec!["p:entity:id:A"]);
        assert!(registry.matching("p:other:*").is_empty());
    }

    #[test]
    fn test_entries_are_sorted() {
        let registry = KeyRegistry::new();
        registry.track("b");
        registry.track("a");

        let keys: Vec<_> = registry.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_concurrent_track_untrack_snapshot() {
        let registry = Arc::new(KeyRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k:{}:{}", t, i);
                        registry.track(&key);
                        let snapshot = registry.snapshot();
                        let unique: std::collections::HashSet<_> = snapshot.iter().collect();
                        assert_eq!(unique.len(), snapshot.len());
                        if i % 2 == 0 {
                            registry.untrack(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(registry.len(), 8 * 250);
    }
}

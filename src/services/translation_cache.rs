use crate::models::TranslationRecord;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct CacheEntry {
    records: Vec<TranslationRecord>,
    stored_at: Instant,
}

/// Expiring cache of dictionary results keyed by lookup key.
pub struct TranslationCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TranslationCache {
    pub fn new(ttl: Duration) -> Self {
        TranslationCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Vec<TranslationRecord>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Vec<TranslationRecord>> {
        let mut entries = self.lock();
        let expired = now.saturating_duration_since(entries.get(key)?.stored_at) >= self.ttl;
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.records.clone())
    }

    pub fn insert(&self, key: impl Into<String>, records: Vec<TranslationRecord>) {
        self.insert_at(key.into(), records, Instant::now());
    }

    fn insert_at(&self, key: String, records: Vec<TranslationRecord>, stored_at: Instant) {
        self.lock().insert(key, CacheEntry { records, stored_at });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Keeps only the `max_entries` most recently stored entries.
    pub fn prune(&self, max_entries: usize) -> usize {
        let mut entries = self.lock();
        if entries.len() <= max_entries {
            return 0;
        }

        let mut by_age: Vec<(String, Instant)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.stored_at))
            .collect();
        by_age.sort_by(|a, b| b.1.cmp(&a.1));

        let evicted = by_age.split_off(max_entries);
        for (key, _) in &evicted {
            entries.remove(key);
        }
        evicted.len()
    }
}

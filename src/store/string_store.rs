//! String keyspace with optional millisecond expiry.
//!
//! Values are raw bytes: RESP bulk strings are binary-safe and `SET` must
//! round-trip whatever the client sent. Expiry is lazy: an entry past its
//! deadline is removed by the read that observes it, and `keys` sweeps the
//! whole map before listing. The store is not internally synchronised;
//! callers share it behind a `Mutex`.

use std::collections::HashMap;

use jiff::Timestamp;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StringStoreError {
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringEntry {
    pub value: Vec<u8>,
    /// Absolute deadline; a reader at or past this instant must observe absence.
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Default)]
pub struct StringStore {
    entries: HashMap<String, StringEntry>,
}

impl StringStore {
    pub fn new() -> Self {
        StringStore {
            entries: HashMap::new(),
        }
    }

    /// Stores `value` under `key`, clearing any existing expiry.
    pub fn set(&mut self, key: String, value: Vec<u8>) {
        self.entries.insert(
            key,
            StringEntry {
                value,
                expires_at: None,
            },
        );
    }

    /// Stores `value` under `key` with an absolute expiry deadline.
    pub fn set_with_deadline(&mut self, key: String, value: Vec<u8>, deadline: Timestamp) {
        self.entries.insert(
            key,
            StringEntry {
                value,
                expires_at: Some(deadline),
            },
        );
    }

    /// Returns the live value for `key`, removing it first if expired.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        if self.remove_if_expired(key) {
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Increments the integer at `key`, initialising an absent key to 1. The
    /// stored bytes must form a decimal integer in ASCII.
    pub fn incr(&mut self, key: &str) -> Result<i64, StringStoreError> {
        self.remove_if_expired(key);

        let Some(entry) = self.entries.get_mut(key) else {
            self.set(key.to_string(), b"1".to_vec());
            return Ok(1);
        };

        let current = str::from_utf8(&entry.value)
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(StringStoreError::NotAnInteger)?;
        let incremented = current
            .checked_add(1)
            .ok_or(StringStoreError::NotAnInteger)?;

        entry.value = incremented.to_string().into_bytes();

        Ok(incremented)
    }

    /// Lists all live keys, sweeping expired entries first. Order is unspecified.
    pub fn keys(&mut self) -> Vec<String> {
        let now = Timestamp::now();
        self.entries
            .retain(|_, entry| !matches!(entry.expires_at, Some(deadline) if now > deadline));

        self.entries.keys().cloned().collect()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        !self.remove_if_expired(key) && self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Inserts an entry loaded from an RDB file. Entries whose absolute expiry
    /// already passed are dropped on the first read instead of here, matching
    /// the lazy policy.
    pub fn load_entry(&mut self, key: String, value: Vec<u8>, expires_at: Option<Timestamp>) {
        self.entries.insert(key, StringEntry { value, expires_at });
    }

    fn remove_if_expired(&mut self, key: &str) -> bool {
        let expired = matches!(
            self.entries.get(key),
            Some(StringEntry {
                expires_at: Some(deadline),
                ..
            }) if Timestamp::now() > *deadline
        );

        if expired {
            self.entries.remove(key);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use super::{StringStore, StringStoreError};

    fn past_deadline() -> Timestamp {
        Timestamp::now() - SignedDuration::from_millis(50)
    }

    fn future_deadline() -> Timestamp {
        Timestamp::now() + SignedDuration::from_secs(60)
    }

    #[test]
    fn test_set_and_get() {
        let mut store = StringStore::new();

        store.set("foo".to_string(), b"bar".to_vec());
        assert_eq!(store.get("foo"), Some(b"bar".to_vec()));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_values_are_binary_safe() {
        let mut store = StringStore::new();

        let payload = vec![0x00, 0xFF, 0x0D, 0x0A, 0x80];
        store.set("bin".to_string(), payload.clone());

        assert_eq!(store.get("bin"), Some(payload));
    }

    #[test]
    fn test_set_overwrites_and_clears_expiry() {
        let mut store = StringStore::new();

        store.set_with_deadline("foo".to_string(), b"old".to_vec(), past_deadline());
        store.set("foo".to_string(), b"new".to_vec());

        assert_eq!(store.get("foo"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_expired_entry_reads_as_absent_and_is_removed() {
        let mut store = StringStore::new();

        store.set_with_deadline("foo".to_string(), b"bar".to_vec(), past_deadline());

        assert_eq!(store.get("foo"), None);
        assert!(!store.exists("foo"));
    }

    #[test]
    fn test_live_deadline_still_readable() {
        let mut store = StringStore::new();

        store.set_with_deadline("foo".to_string(), b"bar".to_vec(), future_deadline());

        assert_eq!(store.get("foo"), Some(b"bar".to_vec()));
        assert!(store.exists("foo"));
    }

    #[test]
    fn test_incr() {
        let mut store = StringStore::new();

        assert_eq!(store.incr("counter"), Ok(1));
        assert_eq!(store.incr("counter"), Ok(2));
        assert_eq!(store.get("counter"), Some(b"2".to_vec()));

        store.set("negative".to_string(), b"-5".to_vec());
        assert_eq!(store.incr("negative"), Ok(-4));

        store.set("words".to_string(), b"abc".to_vec());
        assert_eq!(store.incr("words"), Err(StringStoreError::NotAnInteger));

        store.set("binary".to_string(), vec![0xFF, 0x00]);
        assert_eq!(store.incr("binary"), Err(StringStoreError::NotAnInteger));

        store.set("huge".to_string(), i64::MAX.to_string().into_bytes());
        assert_eq!(store.incr("huge"), Err(StringStoreError::NotAnInteger));
    }

    #[test]
    fn test_keys_sweeps_expired_entries() {
        let mut store = StringStore::new();

        store.set("alive".to_string(), b"1".to_vec());
        store.set_with_deadline("dead".to_string(), b"2".to_vec(), past_deadline());

        let keys = store.keys();
        assert_eq!(keys, vec!["alive".to_string()]);
    }

    #[test]
    fn test_load_entry_keeps_rdb_expiry() {
        let mut store = StringStore::new();

        store.load_entry("kept".to_string(), b"v".to_vec(), Some(future_deadline()));
        store.load_entry("stale".to_string(), b"v".to_vec(), Some(past_deadline()));

        assert_eq!(store.get("kept"), Some(b"v".to_vec()));
        assert_eq!(store.get("stale"), None);
    }
}

//! Process-wide IPSec key store
//!
//! Maps peer identities to [`KeyRecord`]s with a two-tier lookup: an exact
//! entry for the address wins, otherwise the wildcard key applies, otherwise
//! there is no key.
//!
//! The store is written rarely (startup, reload) and read by every endpoint
//! operation, so it sits behind a reader/writer lock. Records are handed out
//! as `Arc`s and never borrowed across the lock.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::key::{KeyIdentity, KeyRecord};

static GLOBAL_KEYS: Lazy<Arc<KeyStore>> = Lazy::new(|| Arc::new(KeyStore::new()));

#[derive(Default)]
struct Entries {
    by_address: HashMap<String, Arc<KeyRecord>>,
    wildcard: Option<Arc<KeyRecord>>,
}

/// Thread-safe key store
#[derive(Default)]
pub struct KeyStore {
    entries: RwLock<Entries>,
}

impl KeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store, empty until the first load
    pub fn global() -> Arc<KeyStore> {
        Arc::clone(&GLOBAL_KEYS)
    }

    /// Install a record, replacing any previous record for the same identity
    pub fn put(&self, identity: KeyIdentity, record: KeyRecord) {
        let record = Arc::new(record);
        let mut entries = self.entries.write();
        match identity {
            KeyIdentity::Address(addr) => {
                entries.by_address.insert(addr, record);
            }
            KeyIdentity::Wildcard => entries.wildcard = Some(record),
        }
    }

    /// Resolve the key for `address`
    ///
    /// Falls back to the wildcard key when `address` has no entry.
    pub fn lookup(&self, address: &str) -> Option<Arc<KeyRecord>> {
        let entries = self.entries.read();
        entries
            .by_address
            .get(address)
            .or(entries.wildcard.as_ref())
            .cloned()
    }

    /// Remove the record for exactly `identity`, without fallback
    pub fn remove(&self, identity: &KeyIdentity) -> Option<Arc<KeyRecord>> {
        let mut entries = self.entries.write();
        match identity {
            KeyIdentity::Address(addr) => entries.by_address.remove(addr),
            KeyIdentity::Wildcard => entries.wildcard.take(),
        }
    }

    /// Whether a record exists for exactly `identity`
    pub fn contains(&self, identity: &KeyIdentity) -> bool {
        let entries = self.entries.read();
        match identity {
            KeyIdentity::Address(addr) => entries.by_address.contains_key(addr),
            KeyIdentity::Wildcard => entries.wildcard.is_some(),
        }
    }

    /// Drop every record
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.by_address.clear();
        entries.wildcard = None;
    }

    /// Number of records, counting the wildcard
    pub fn len(&self) -> usize {
        let entries = self.entries.read();
        entries.by_address.len() + usize::from(entries.wildcard.is_some())
    }

    /// True if no record is installed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut addresses: Vec<&String> = entries.by_address.keys().collect();
        addresses.sort();
        f.debug_struct("KeyStore")
            .field("addresses", &addresses)
            .field("wildcard", &entries.wildcard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podsec_platform::XfrmAlgo;

    fn record(tag: u8) -> KeyRecord {
        KeyRecord::new(
            XfrmAlgo::new("hmac(sha256)", vec![tag; 32]),
            XfrmAlgo::new("cbc(aes)", vec![tag; 16]),
        )
    }

    #[test]
    fn test_empty_store() {
        let store = KeyStore::new();
        assert!(store.is_empty());
        assert!(store.lookup("1.2.3.4").is_none());
    }

    #[test]
    fn test_exact_match_wins() {
        let store = KeyStore::new();
        store.put(KeyIdentity::Wildcard, record(0x01));
        store.put(KeyIdentity::address("1.2.3.4"), record(0x02));

        assert_eq!(store.lookup("1.2.3.4").unwrap().auth.key[0], 0x02);
        assert_eq!(store.lookup("5.6.7.8").unwrap().auth.key[0], 0x01);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_no_wildcard_no_fallback() {
        let store = KeyStore::new();
        store.put(KeyIdentity::address("1.2.3.4"), record(0x02));

        assert!(store.lookup("1.2.3.4").is_some());
        assert!(store.lookup("1.1.3.4").is_none());
    }

    #[test]
    fn test_empty_string_is_not_wildcard() {
        let store = KeyStore::new();
        store.put(KeyIdentity::address(""), record(0x03));

        assert!(!store.contains(&KeyIdentity::Wildcard));
        assert!(store.lookup("1.2.3.4").is_none());
        assert!(store.lookup("").is_some());
    }

    #[test]
    fn test_put_overwrites() {
        let store = KeyStore::new();
        store.put(KeyIdentity::Wildcard, record(0x01));
        store.put(KeyIdentity::Wildcard, record(0x09));

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("any").unwrap().crypt.key[0], 0x09);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = KeyStore::new();
        store.put(KeyIdentity::Wildcard, record(0x01));
        store.put(KeyIdentity::address("1.2.3.4"), record(0x02));

        let removed = store.remove(&KeyIdentity::address("1.2.3.4")).unwrap();
        assert_eq!(removed.auth.key[0], 0x02);
        assert_eq!(store.lookup("1.2.3.4").unwrap().auth.key[0], 0x01);

        store.clear();
        assert!(store.is_empty());
        assert!(store.remove(&KeyIdentity::Wildcard).is_none());
    }

    #[test]
    fn test_concurrent_lookups_during_put() {
        let store = Arc::new(KeyStore::new());
        store.put(KeyIdentity::Wildcard, record(0x01));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for _ in 0..1_000 {
                        let key = store.lookup("10.0.0.1").expect("wildcard always present");
                        assert!(key.auth.key[0] == 0x01 || key.auth.key[0] == 0x02);
                    }
                });
            }

            s.spawn(|| {
                for _ in 0..100 {
                    store.put(KeyIdentity::address("10.0.0.1"), record(0x02));
                }
            });
        });

        assert_eq!(store.lookup("10.0.0.1").unwrap().auth.key[0], 0x02);
    }

    #[test]
    fn test_debug_lists_identities_only() {
        let store = KeyStore::new();
        store.put(KeyIdentity::address("1.2.3.4"), record(0xAB));
        let printed = format!("{:?}", store);
        assert!(printed.contains("1.2.3.4"));
        assert!(printed.contains("wildcard: false"));
    }
}

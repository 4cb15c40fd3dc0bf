//! IPSec key and endpoint integration tests
//!
//! End-to-end flows through the loader, key store and endpoint manager,
//! with the in-memory programmer standing in for the kernel.

#![cfg(feature = "ipsec")]

use podsec_datapath::ipsec::{
    load_ipsec_keys_file, Direction, EndpointManager, ErrorKind, KeyIdentity, KeyRecord, KeyStore,
};
use podsec_platform::mock::MemoryProgrammer;
use podsec_platform::{Cidr, PolicyDir, XfrmAlgo};
use rand::{Rng, RngCore};
use std::io::{Cursor, Write};
use std::sync::Arc;

const KEYS_DAT: &str = "hmac(sha256) 0123456789abcdef0123456789abcdef cbc(aes) 0123456789abcdef0123456789abcdef\n\
                        hmac(sha256) 0123456789abcdef0123456789abcdef cbc(aes) 0123456789abcdef0123456789abcdef foobar\n";

const INVALID_KEYS_DAT: &str =
    "test abcdefghijklmnopqrstuvwzyzABCDEF test abcdefghijklmnopqrstuvwzyzABCDEF\n";

/// Helper function to build a fixed test key record
fn test_key() -> KeyRecord {
    KeyRecord {
        spi: 1,
        reqid: 1,
        auth: XfrmAlgo::new("hmac(sha256)", b"0123456789abcdef0123456789abcdef".to_vec()),
        crypt: XfrmAlgo::new("cbc(aes)", b"0123456789abcdef0123456789abcdef".to_vec()),
    }
}

/// Helper function to create a manager over a fresh store
fn setup() -> (Arc<KeyStore>, Arc<MemoryProgrammer>, EndpointManager) {
    let keys = Arc::new(KeyStore::new());
    let programmer = Arc::new(MemoryProgrammer::new());
    let manager = EndpointManager::new(keys.clone(), programmer.clone());
    (keys, programmer, manager)
}

fn cidr(s: &str) -> Cidr {
    s.parse().expect("valid CIDR")
}

//
// Test Cases - Key loading
//

#[test]
fn test_load_keys_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_ipsec_keys_file(dir.path().join("ipsec_keys_test")).unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[test]
fn test_invalid_load_keys() {
    let (keys, _programmer, manager) = setup();

    let err = keys.load(Cursor::new(INVALID_KEYS_DAT)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(keys.is_empty());

    let err = manager
        .upsert_endpoint(&cidr("1.1.3.4/16"), &cidr("1.2.3.4/16"), 1, Direction::Bidirectional)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyMissing);
}

#[test]
fn test_load_keys() {
    let keys = KeyStore::new();
    let installed = keys.load(Cursor::new(KEYS_DAT)).unwrap();

    assert_eq!(installed, 2);
    assert!(keys.contains(&KeyIdentity::Wildcard));
    assert!(keys.contains(&KeyIdentity::address("foobar")));
}

#[test]
fn test_load_keys_file_through_manager() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(KEYS_DAT.as_bytes()).unwrap();
    file.flush().unwrap();

    let keys = Arc::new(KeyStore::new());
    let programmer = Arc::new(MemoryProgrammer::new());
    let config = podsec_datapath::ipsec::EndpointConfig::builder()
        .with_key_file(file.path())
        .build()
        .unwrap();
    let manager = EndpointManager::new(keys, programmer.clone()).with_config(config);

    assert_eq!(manager.load_keys().unwrap(), 2);
    manager
        .upsert_endpoint(&cidr("10.1.0.1/24"), &cidr("10.2.0.1/24"), 1, Direction::Bidirectional)
        .unwrap();
    assert_eq!(programmer.state_count(), 2);

    let snapshot = manager.metrics().snapshot();
    assert_eq!(snapshot.key_loads_total, 1);
    assert_eq!(snapshot.keys_installed, 2);
}

#[test]
fn test_failed_load_counted_by_manager() {
    let dir = tempfile::tempdir().unwrap();
    let config = podsec_datapath::ipsec::EndpointConfig::builder()
        .with_key_file(dir.path().join("ipsec_keys_test"))
        .build()
        .unwrap();
    let (_keys, _programmer, manager) = setup();
    let manager = manager.with_config(config);

    let err = manager.load_keys().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);

    let snapshot = manager.metrics().snapshot();
    assert_eq!(snapshot.key_loads_total, 0);
    assert_eq!(snapshot.key_load_failures, 1);
}

#[test]
fn test_partial_load_keeps_earlier_lines() {
    let (keys, programmer, manager) = setup();
    let content = format!("{}{}", KEYS_DAT, INVALID_KEYS_DAT);

    let err = keys.load(Cursor::new(content)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);

    // The wildcard from line 1 is still usable
    manager
        .upsert_endpoint(&cidr("1.1.3.4/16"), &cidr("1.2.3.4/16"), 1, Direction::Bidirectional)
        .unwrap();
    assert_eq!(programmer.state_count(), 2);
}

//
// Test Cases - Endpoint programming
//

#[test]
fn test_upsert_ipsec_equals() {
    let (keys, programmer, manager) = setup();
    keys.put(KeyIdentity::Wildcard, test_key());

    let local = cidr("1.2.3.4/16");
    let remote = cidr("1.2.3.4/16");

    manager
        .upsert_endpoint(&local, &remote, 1, Direction::Bidirectional)
        .unwrap();
    // Identical endpoints collapse onto a single state
    assert_eq!(programmer.state_count(), 1);
    assert_eq!(programmer.policy_count(), 2);

    manager.delete_endpoint(remote.addr(), local.addr()).unwrap();
    assert_eq!(programmer.state_count(), 0);
    assert_eq!(programmer.policy_count(), 0);

    keys.remove(&KeyIdentity::Wildcard);
    assert!(keys.is_empty());
}

#[test]
fn test_upsert_ipsec_endpoint() {
    let (keys, programmer, manager) = setup();
    keys.put(KeyIdentity::address("1.1.3.4"), test_key());
    keys.put(KeyIdentity::address("1.2.3.4"), test_key());
    keys.put(KeyIdentity::Wildcard, test_key());

    let local = cidr("1.1.3.4/16");
    let remote = cidr("1.2.3.4/16");

    manager
        .upsert_endpoint(&local, &remote, 1, Direction::Bidirectional)
        .unwrap();

    let outbound = programmer
        .state(local.addr(), remote.addr(), 1)
        .expect("outbound state");
    assert_eq!(outbound.auth.name, "hmac(sha256)");
    assert_eq!(outbound.crypt.name, "cbc(aes)");
    assert!(programmer.state(remote.addr(), local.addr(), 1).is_some());

    let dirs: Vec<PolicyDir> = programmer.policies().iter().map(|p| p.dir).collect();
    assert!(dirs.contains(&PolicyDir::In));
    assert!(dirs.contains(&PolicyDir::Out));

    manager.delete_endpoint(remote.addr(), local.addr()).unwrap();
    assert_eq!(programmer.state_count(), 0);
    assert_eq!(programmer.policy_count(), 0);
}

#[test]
fn test_upsert_ipsec_key_missing() {
    let (_keys, programmer, manager) = setup();

    let local = cidr("1.1.3.4/16");
    let remote = cidr("1.2.3.4/16");

    let err = manager
        .upsert_endpoint(&local, &remote, 1, Direction::Bidirectional)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to replace local state: IPSec key missing"
    );
    assert_eq!(programmer.state_count(), 0);

    manager.delete_endpoint(remote.addr(), local.addr()).unwrap();
}

#[test]
fn test_specific_key_without_wildcard() {
    let (keys, _programmer, manager) = setup();
    keys.put(KeyIdentity::address("1.2.3.4"), test_key());

    manager
        .upsert_endpoint(&cidr("1.1.3.4/16"), &cidr("1.2.3.4/16"), 1, Direction::Bidirectional)
        .unwrap();

    // A remote with no key of its own and no wildcard to fall back on
    let err = manager
        .upsert_endpoint(&cidr("1.2.3.4/16"), &cidr("1.1.3.4/16"), 1, Direction::Bidirectional)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyMissing);
}

#[test]
fn test_concurrent_endpoints() {
    let (keys, programmer, manager) = setup();
    keys.put(KeyIdentity::Wildcard, test_key());
    let manager = Arc::new(manager);

    std::thread::scope(|s| {
        for i in 0..8u8 {
            let manager = Arc::clone(&manager);
            s.spawn(move || {
                let local = cidr(&format!("10.0.{}.1/24", i));
                let remote = cidr(&format!("10.1.{}.1/24", i));
                for _ in 0..10 {
                    manager
                        .upsert_endpoint(&local, &remote, 1, Direction::Bidirectional)
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(programmer.state_count(), 16);
    assert_eq!(programmer.policy_count(), 16);
    assert_eq!(manager.metrics().snapshot().endpoint_upserts, 80);
}

//
// Test Cases - Parser round trip
//

#[test]
fn test_random_key_round_trip() {
    let mut rng = rand::thread_rng();

    for _ in 0..64 {
        let mut auth = vec![0u8; rng.gen_range(1..=64)];
        let mut crypt = vec![0u8; rng.gen_range(1..=32)];
        rng.fill_bytes(&mut auth);
        rng.fill_bytes(&mut crypt);

        let record = KeyRecord::new(
            XfrmAlgo::new("hmac(sha512)", auth.clone()),
            XfrmAlgo::new("cbc(aes)", crypt.clone()),
        );
        let identity = if rng.gen_bool(0.5) {
            KeyIdentity::Wildcard
        } else {
            KeyIdentity::address(format!("10.0.{}.{}", rng.gen::<u8>(), rng.gen::<u8>()))
        };

        let line = record.to_line(&identity);
        let (parsed_identity, parsed) = KeyRecord::parse_line(&line).unwrap();

        assert_eq!(parsed_identity, identity);
        assert_eq!(parsed.auth.key.as_slice(), auth.as_slice());
        assert_eq!(parsed.crypt.key.as_slice(), crypt.as_slice());
        assert_eq!(parsed, record);
    }
}

//! Encryption datapath for the podsec container network.
//!
//! This crate maintains the IPSec key store and programs kernel XFRM
//! states and policies for node and pod endpoint pairs.
//!
//! # Features
//!
//! - `ipsec` (default) - IPSec key store and endpoint programming
//!
//! # Example
//!
//! ```rust
//! use podsec_datapath::ipsec::{KeyIdentity, KeyRecord, KeyStore};
//!
//! let store = KeyStore::new();
//! let line = "hmac(sha256) 00112233 cbc(aes) 44556677 10.0.0.1";
//! let (identity, record) = KeyRecord::parse_line(line).unwrap();
//! store.put(identity, record);
//!
//! assert!(store.lookup("10.0.0.1").is_some());
//! assert!(store.lookup("10.0.0.2").is_none());
//! ```
//!
//! # Security
//!
//! - No unsafe code
//! - Key material is zeroized on drop and never logged

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ipsec")]
pub mod ipsec;

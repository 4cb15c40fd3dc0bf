//! IPSec key store and endpoint programming
//!
//! This module turns a small key database into kernel IPSec Security
//! Associations and policies for pairs of network endpoints:
//!
//! - **Key Parser** ([`key`]) - validates one key file line
//! - **Key Store** ([`store`]) - process-wide exact-match / wildcard lookup
//! - **Key File Loader** ([`loader`]) - streams a key file into the store
//! - **Endpoint Manager** ([`endpoint`]) - derives and programs states and
//!   policies per direction
//!
//! # Architecture
//!
//! ```text
//! key file ──► loader ──► key::parse_line ──► KeyStore (RwLock)
//!                                                 │ lookup(remote)
//!                                                 ▼
//!                           EndpointManager ──► XfrmProgrammer (kernel)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use podsec_datapath::ipsec::{load_ipsec_keys_file, Direction, EndpointManager};
//! use podsec_platform::mock::MemoryProgrammer;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Populate the process-wide key store
//!     load_ipsec_keys_file("/etc/ipsec/keys")?;
//!
//!     // Program both directions between two pod ranges
//!     let manager = EndpointManager::with_global_keys(Arc::new(MemoryProgrammer::new()));
//!     let local = "10.1.0.5/16".parse()?;
//!     let remote = "10.2.0.7/16".parse()?;
//!     manager.upsert_endpoint(&local, &remote, 3, Direction::Bidirectional)?;
//!
//!     // Tear down again
//!     manager.delete_endpoint(remote.addr(), local.addr())?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod key;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod store;

// Re-export commonly used types
pub use config::EndpointConfig;
pub use endpoint::{Direction, EndpointManager};
pub use error::{Error, ErrorKind, Result};
pub use key::{KeyIdentity, KeyRecord};
pub use loader::load_ipsec_keys_file;
pub use store::KeyStore;

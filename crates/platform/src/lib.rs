//! # podsec platform
//!
//! Kernel-facing types for the podsec encryption datapath.
//!
//! This crate provides:
//! - XFRM state and policy descriptors (`XfrmState`, `XfrmPolicy`, ...)
//! - The `Cidr` address-range type used in policy selectors
//! - The `XfrmProgrammer` trait implemented by kernel backends
//! - A unified collaborator error type (`XfrmError`, `XfrmResult`)
//! - An in-memory programmer for tests (`mock::MemoryProgrammer`)
//!
//! # Examples
//!
//! ```
//! use podsec_platform::{Cidr, XfrmResult};
//!
//! fn pod_range() -> XfrmResult<Cidr> {
//!     Ok("10.1.0.0/16".parse().expect("valid CIDR"))
//! }
//!
//! # fn main() -> XfrmResult<()> {
//! let range = pod_range()?;
//! assert!(range.contains(&"10.1.42.7".parse().unwrap()));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cidr;
pub mod error;
pub mod mock;
pub mod traits;
pub mod xfrm;

pub use cidr::{Cidr, CidrParseError};
pub use error::{XfrmError, XfrmResult};
pub use traits::XfrmProgrammer;
pub use xfrm::{
    PolicyDir, XfrmAlgo, XfrmMark, XfrmMode, XfrmPolicy, XfrmPolicyId, XfrmState, XfrmStateId,
    XfrmTemplate, IPPROTO_ESP,
};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Structured logging for IPSec key and endpoint operations
//!
//! Provides structured, contextual logging using the `tracing` framework.
//! Key material is never logged; records are identified by algorithm names
//! and key lengths only.
//!
//! # Log Levels
//!
//! - **DEBUG**: Individual states, policies and key records
//! - **INFO**: Key file loads, endpoint upserts and deletes
//! - **WARN**: Rejected key lines, missing keys
//! - **ERROR**: Kernel programming failures
//!
//! # Example
//!
//! ```no_run
//! use podsec_datapath::ipsec::logging;
//!
//! // Initialize tracing subscriber (in tests or applications)
//! tracing_subscriber::fmt()
//!     .with_env_filter("podsec_datapath::ipsec=debug")
//!     .init();
//!
//! logging::log_keys_loaded("/etc/ipsec/keys", 2);
//! ```

use podsec_platform::{XfrmPolicy, XfrmState};
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

use super::endpoint::Direction;
use super::key::{KeyIdentity, KeyRecord};

/// Log a completed key file load
///
/// # Arguments
///
/// * `path` - Key file path
/// * `count` - Number of records installed
pub fn log_keys_loaded(path: &str, count: usize) {
    info!(path = path, keys = count, "IPSec keys loaded");
}

/// Log a key line that failed to parse
///
/// # Arguments
///
/// * `line` - 1-based line number
/// * `error` - Parse error message
pub fn log_key_line_rejected(line: usize, error: &str) {
    warn!(line = line, error = error, "IPSec key line rejected");
}

/// Log a key record installed into the store
pub fn log_key_installed(identity: &KeyIdentity, record: &KeyRecord) {
    debug!(
        identity = %identity,
        auth = %record.auth.name,
        auth_bits = record.auth.key_bits(),
        crypt = %record.crypt.name,
        crypt_bits = record.crypt.key_bits(),
        "IPSec key installed"
    );
}

/// Log a failed key lookup
///
/// # Arguments
///
/// * `remote` - Address that had no key
/// * `context` - Step that needed the key
pub fn log_key_missing(remote: IpAddr, context: &str) {
    warn!(remote = %remote, context = context, "IPSec key missing");
}

/// Log a state handed to the programmer
pub fn log_state_replaced(state: &XfrmState) {
    debug!(
        src = %state.src,
        dst = %state.dst,
        spi = state.spi,
        reqid = state.reqid,
        "XFRM state replaced"
    );
}

/// Log a policy handed to the programmer
pub fn log_policy_replaced(policy: &XfrmPolicy) {
    debug!(
        src = %policy.src,
        dst = %policy.dst,
        dir = %policy.dir,
        reqid = policy.tmpl.reqid,
        "XFRM policy replaced"
    );
}

/// Log a completed endpoint upsert
pub fn log_endpoint_upserted(local: IpAddr, remote: IpAddr, spi: u32, direction: Direction) {
    info!(
        local = %local,
        remote = %remote,
        spi = spi,
        direction = %direction,
        "IPSec endpoint upserted"
    );
}

/// Log a completed endpoint delete
pub fn log_endpoint_deleted(remote: IpAddr, local: IpAddr) {
    info!(remote = %remote, local = %local, "IPSec endpoint deleted");
}

/// Log a delete that found nothing to remove
///
/// # Arguments
///
/// * `what` - Description of the state or policy
pub fn log_nothing_to_delete(what: &str) {
    debug!(entry = what, "XFRM entry already absent");
}

/// Log a programming failure
///
/// # Arguments
///
/// * `context` - Step that failed
/// * `error` - Programmer error message
pub fn log_programming_failed(context: &str, error: &str) {
    error!(context = context, error = error, "XFRM programming failed");
}

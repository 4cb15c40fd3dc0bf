//! Endpoint SA and policy programming
//!
//! Turns a (local range, remote range, SPI, direction) request into one
//! state and one policy per direction and hands them to an
//! [`XfrmProgrammer`].
//!
//! # Derivation
//!
//! ```text
//! Outbound: state  local.addr  -> remote.addr   (encrypt mark)
//!           policy local.net   -> remote.net    dir out
//! Inbound:  state  remote.addr -> local.addr    (decrypt mark)
//!           policy remote.net  -> local.net     dir in
//! ```
//!
//! The key for both directions is resolved from the remote address. Upserts
//! replace whatever is already programmed, so a failed upsert can simply be
//! retried. Deletes treat "nothing to delete" as success.
//!
//! # Example
//!
//! ```
//! use podsec_datapath::ipsec::{Direction, EndpointManager, KeyIdentity, KeyRecord, KeyStore};
//! use podsec_platform::mock::MemoryProgrammer;
//! use std::sync::Arc;
//!
//! let keys = Arc::new(KeyStore::new());
//! let line = "hmac(sha256) 0123456789abcdef0123456789abcdef cbc(aes) 0123456789abcdef0123456789abcdef";
//! let (identity, record) = KeyRecord::parse_line(line).unwrap();
//! keys.put(identity, record);
//!
//! let programmer = Arc::new(MemoryProgrammer::new());
//! let manager = EndpointManager::new(keys, programmer.clone());
//!
//! let local = "10.1.0.5/16".parse().unwrap();
//! let remote = "10.2.0.7/16".parse().unwrap();
//! manager.upsert_endpoint(&local, &remote, 3, Direction::Bidirectional).unwrap();
//! assert_eq!(programmer.state_count(), 2);
//!
//! manager.delete_endpoint(remote.addr(), local.addr()).unwrap();
//! assert_eq!(programmer.state_count(), 0);
//! ```

use podsec_platform::{
    Cidr, PolicyDir, XfrmPolicy, XfrmPolicyId, XfrmProgrammer, XfrmResult, XfrmState,
    XfrmStateId, XfrmTemplate, IPPROTO_ESP,
};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use super::config::EndpointConfig;
use super::key::KeyRecord;
use super::logging;
use super::metrics::IpsecMetrics;
use super::store::KeyStore;
use super::{Error, ErrorKind, Result};

/// Which traffic directions an endpoint request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Traffic from the remote range to the local range
    Inbound,
    /// Traffic from the local range to the remote range
    Outbound,
    /// Both of the above
    Bidirectional,
}

impl Direction {
    /// The concrete directions this expands to, inbound first
    pub fn expand(self) -> &'static [Direction] {
        match self {
            Direction::Inbound => &[Direction::Inbound],
            Direction::Outbound => &[Direction::Outbound],
            Direction::Bidirectional => &[Direction::Inbound, Direction::Outbound],
        }
    }

    fn state_context(self) -> &'static str {
        match self {
            Direction::Outbound => "unable to replace remote state",
            _ => "unable to replace local state",
        }
    }

    fn policy_context(self) -> &'static str {
        match self {
            Direction::Outbound => "unable to replace policy out",
            _ => "unable to replace policy in",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "in"),
            Direction::Outbound => write!(f, "out"),
            Direction::Bidirectional => write!(f, "both"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "inbound" => Ok(Direction::Inbound),
            "out" | "outbound" => Ok(Direction::Outbound),
            "both" | "bidirectional" => Ok(Direction::Bidirectional),
            other => Err(Error::InvalidParameter(format!(
                "unknown direction {:?}",
                other
            ))),
        }
    }
}

/// Programs IPSec endpoints from the key store
///
/// Holds no per-endpoint state; safe to share across threads.
pub struct EndpointManager {
    keys: Arc<KeyStore>,
    programmer: Arc<dyn XfrmProgrammer>,
    config: EndpointConfig,
    metrics: IpsecMetrics,
}

impl EndpointManager {
    /// Create a manager with default configuration
    pub fn new(keys: Arc<KeyStore>, programmer: Arc<dyn XfrmProgrammer>) -> Self {
        Self {
            keys,
            programmer,
            config: EndpointConfig::default(),
            metrics: IpsecMetrics::new(),
        }
    }

    /// Create a manager backed by the process-wide key store
    pub fn with_global_keys(programmer: Arc<dyn XfrmProgrammer>) -> Self {
        Self::new(KeyStore::global(), programmer)
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: IpsecMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Key store this manager reads
    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Active configuration
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Metrics for this manager
    pub fn metrics(&self) -> &IpsecMetrics {
        &self.metrics
    }

    /// Load the configured key file into the key store
    ///
    /// # Errors
    ///
    /// See [`KeyStore::load_file`].
    pub fn load_keys(&self) -> Result<usize> {
        match self.keys.load_file(&self.config.key_file) {
            Ok(installed) => {
                self.metrics.record_key_load(installed);
                Ok(installed)
            }
            Err(e) => {
                self.metrics.record_key_load_failed();
                Err(e)
            }
        }
    }

    /// Install or replace the states and policies for an endpoint pair
    ///
    /// Directions are programmed inbound first. The first failure stops the
    /// call; anything already programmed stays in place.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for SPI 0 or mixed address families
    /// - [`Error::KeyMissing`] if neither the remote address nor the wildcard
    ///   has a key
    /// - [`Error::ProgrammingFailed`] if the programmer rejects a state or
    ///   policy
    pub fn upsert_endpoint(
        &self,
        local: &Cidr,
        remote: &Cidr,
        spi: u32,
        direction: Direction,
    ) -> Result<()> {
        let result = self.try_upsert(local, remote, spi, direction);
        match &result {
            Ok(()) => {
                self.metrics.record_upsert();
                logging::log_endpoint_upserted(local.addr(), remote.addr(), spi, direction);
            }
            Err(e) => self
                .metrics
                .record_upsert_failed(e.kind() == ErrorKind::KeyMissing),
        }
        result
    }

    fn try_upsert(
        &self,
        local: &Cidr,
        remote: &Cidr,
        spi: u32,
        direction: Direction,
    ) -> Result<()> {
        if spi == 0 {
            return Err(Error::InvalidParameter("SPI must be non-zero".into()));
        }
        if local.addr().is_ipv4() != remote.addr().is_ipv4() {
            return Err(Error::InvalidParameter(format!(
                "address family mismatch between {} and {}",
                local, remote
            )));
        }

        for &dir in direction.expand() {
            let key = self.keys.lookup(&remote.addr().to_string()).ok_or_else(|| {
                logging::log_key_missing(remote.addr(), dir.state_context());
                Error::KeyMissing {
                    context: dir.state_context(),
                }
            })?;

            let (state, policy) = self.derive(local, remote, spi, &key, dir);

            program(self.programmer.upsert_state(&state), dir.state_context())?;
            self.metrics.record_state_programmed();
            logging::log_state_replaced(&state);

            program(self.programmer.upsert_policy(&policy), dir.policy_context())?;
            self.metrics.record_policy_programmed();
            logging::log_policy_replaced(&policy);
        }

        Ok(())
    }

    /// Build the state and policy for one concrete direction
    fn derive(
        &self,
        local: &Cidr,
        remote: &Cidr,
        spi: u32,
        key: &KeyRecord,
        dir: Direction,
    ) -> (XfrmState, XfrmPolicy) {
        let (src, dst, policy_dir, mark) = match dir {
            Direction::Outbound => (local, remote, PolicyDir::Out, self.config.out_mark),
            _ => (remote, local, PolicyDir::In, self.config.in_mark),
        };

        let state = XfrmState {
            src: src.addr(),
            dst: dst.addr(),
            spi,
            reqid: key.reqid,
            proto: IPPROTO_ESP,
            mode: self.config.mode,
            auth: key.auth.clone(),
            crypt: key.crypt.clone(),
            mark,
        };

        let policy = XfrmPolicy {
            src: src.network(),
            dst: dst.network(),
            dir: policy_dir,
            priority: self.config.policy_priority,
            mark,
            tmpl: XfrmTemplate {
                src: src.addr(),
                dst: dst.addr(),
                proto: IPPROTO_ESP,
                mode: self.config.mode,
                reqid: key.reqid,
            },
        };

        (state, policy)
    }

    /// Remove the states and policies between two endpoints, both directions
    ///
    /// Entries that do not exist are skipped. Every delete is attempted even
    /// if an earlier one fails; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProgrammingFailed`] if the programmer refuses a
    /// delete for a reason other than the entry being absent.
    pub fn delete_endpoint(&self, remote: IpAddr, local: IpAddr) -> Result<()> {
        let mut first_err = None;

        for id in [
            XfrmStateId::between(remote, local),
            XfrmStateId::between(local, remote),
        ] {
            let result = self.programmer.delete_state(&id);
            absorb_delete(&mut first_err, result, &id, "unable to delete state");
        }

        for id in [
            XfrmPolicyId {
                src: remote,
                dst: local,
                dir: PolicyDir::In,
            },
            XfrmPolicyId {
                src: local,
                dst: remote,
                dir: PolicyDir::Out,
            },
        ] {
            let result = self.programmer.delete_policy(&id);
            absorb_delete(&mut first_err, result, &id, "unable to delete policy");
        }

        self.metrics.record_delete(first_err.is_none());
        match first_err {
            None => {
                logging::log_endpoint_deleted(remote, local);
                Ok(())
            }
            Some(e) => Err(e),
        }
    }
}

impl fmt::Debug for EndpointManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointManager")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn program(result: XfrmResult<()>, context: &'static str) -> Result<()> {
    result.map_err(|source| {
        logging::log_programming_failed(context, &source.to_string());
        Error::ProgrammingFailed { context, source }
    })
}

fn absorb_delete(
    first_err: &mut Option<Error>,
    result: XfrmResult<()>,
    what: &dyn fmt::Display,
    context: &'static str,
) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_not_found() => logging::log_nothing_to_delete(&what.to_string()),
        Err(source) => {
            logging::log_programming_failed(context, &source.to_string());
            if first_err.is_none() {
                *first_err = Some(Error::ProgrammingFailed { context, source });
            }
        }
    }
}

//! In-memory XFRM programmer
//!
//! Keeps states and policies in maps with the same replace/delete semantics
//! the kernel applies. Used by tests and for dry runs where no netlink socket
//! is available.
//!
//! # Example
//!
//! ```
//! use podsec_platform::mock::MemoryProgrammer;
//! use podsec_platform::xfrm::XfrmStateId;
//! use podsec_platform::XfrmProgrammer;
//!
//! let programmer = MemoryProgrammer::new();
//! let id = XfrmStateId::between("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap());
//!
//! // Nothing programmed yet
//! assert!(programmer.delete_state(&id).unwrap_err().is_not_found());
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;

use crate::xfrm::{PolicyDir, XfrmPolicy, XfrmPolicyId, XfrmState, XfrmStateId};
use crate::{Cidr, XfrmError, XfrmProgrammer, XfrmResult};

type StateKey = (IpAddr, IpAddr, u32);
type PolicyKey = (Cidr, Cidr, PolicyDir);

#[derive(Default)]
struct Tables {
    states: HashMap<StateKey, XfrmState>,
    policies: HashMap<PolicyKey, XfrmPolicy>,
    fail_next_state: Option<String>,
    fail_next_policy: Option<String>,
    fail_deletes: Option<String>,
}

/// XFRM programmer backed by in-memory tables
#[derive(Default)]
pub struct MemoryProgrammer {
    tables: Mutex<Tables>,
}

impl MemoryProgrammer {
    /// Create an empty programmer
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `upsert_state` call fail with `Rejected(reason)`
    pub fn fail_next_state(&self, reason: impl Into<String>) {
        self.tables.lock().fail_next_state = Some(reason.into());
    }

    /// Make the next `upsert_policy` call fail with `Rejected(reason)`
    pub fn fail_next_policy(&self, reason: impl Into<String>) {
        self.tables.lock().fail_next_policy = Some(reason.into());
    }

    /// Make every delete fail with `Rejected(reason)` until cleared
    pub fn fail_deletes(&self, reason: Option<String>) {
        self.tables.lock().fail_deletes = reason;
    }

    /// Snapshot of programmed states
    pub fn states(&self) -> Vec<XfrmState> {
        self.tables.lock().states.values().cloned().collect()
    }

    /// Snapshot of programmed policies
    pub fn policies(&self) -> Vec<XfrmPolicy> {
        self.tables.lock().policies.values().cloned().collect()
    }

    /// Look up a single state
    pub fn state(&self, src: IpAddr, dst: IpAddr, spi: u32) -> Option<XfrmState> {
        self.tables.lock().states.get(&(src, dst, spi)).cloned()
    }

    /// Number of programmed states
    pub fn state_count(&self) -> usize {
        self.tables.lock().states.len()
    }

    /// Number of programmed policies
    pub fn policy_count(&self) -> usize {
        self.tables.lock().policies.len()
    }
}

impl XfrmProgrammer for MemoryProgrammer {
    fn upsert_state(&self, state: &XfrmState) -> XfrmResult<()> {
        let mut tables = self.tables.lock();
        if let Some(reason) = tables.fail_next_state.take() {
            return Err(XfrmError::Rejected(reason));
        }
        tables
            .states
            .insert((state.src, state.dst, state.spi), state.clone());
        Ok(())
    }

    fn upsert_policy(&self, policy: &XfrmPolicy) -> XfrmResult<()> {
        let mut tables = self.tables.lock();
        if let Some(reason) = tables.fail_next_policy.take() {
            return Err(XfrmError::Rejected(reason));
        }
        tables
            .policies
            .insert((policy.src, policy.dst, policy.dir), policy.clone());
        Ok(())
    }

    fn delete_state(&self, id: &XfrmStateId) -> XfrmResult<()> {
        let mut tables = self.tables.lock();
        if let Some(reason) = &tables.fail_deletes {
            return Err(XfrmError::Rejected(reason.clone()));
        }
        let before = tables.states.len();
        tables.states.retain(|_, state| !id.matches(state));
        if tables.states.len() == before {
            return Err(XfrmError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_policy(&self, id: &XfrmPolicyId) -> XfrmResult<()> {
        let mut tables = self.tables.lock();
        if let Some(reason) = &tables.fail_deletes {
            return Err(XfrmError::Rejected(reason.clone()));
        }
        let before = tables.policies.len();
        tables.policies.retain(|_, policy| !id.matches(policy));
        if tables.policies.len() == before {
            return Err(XfrmError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

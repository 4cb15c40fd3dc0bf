//! Kernel programming interface

use crate::xfrm::{XfrmPolicy, XfrmPolicyId, XfrmState, XfrmStateId};
use crate::XfrmResult;

/// Programs XFRM states and policies into the kernel
///
/// Implementations must tolerate concurrent calls for distinct endpoint
/// pairs. Upserts replace an existing entry with the same key; deletes of an
/// entry that does not exist return an error for which
/// [`XfrmError::is_not_found`](crate::XfrmError::is_not_found) is true.
pub trait XfrmProgrammer: Send + Sync {
    /// Add or replace a state keyed by (src, dst, spi)
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the state
    fn upsert_state(&self, state: &XfrmState) -> XfrmResult<()>;

    /// Add or replace a policy keyed by (selector, direction)
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the policy
    fn upsert_policy(&self, policy: &XfrmPolicy) -> XfrmResult<()>;

    /// Delete every state matching `id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matched, or another error if the
    /// kernel refuses the delete
    fn delete_state(&self, id: &XfrmStateId) -> XfrmResult<()>;

    /// Delete every policy matching `id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matched, or another error if the
    /// kernel refuses the delete
    fn delete_policy(&self, id: &XfrmPolicyId) -> XfrmResult<()>;
}

impl<T: XfrmProgrammer + ?Sized> XfrmProgrammer for std::sync::Arc<T> {
    fn upsert_state(&self, state: &XfrmState) -> XfrmResult<()> {
        (**self).upsert_state(state)
    }

    fn upsert_policy(&self, policy: &XfrmPolicy) -> XfrmResult<()> {
        (**self).upsert_policy(policy)
    }

    fn delete_state(&self, id: &XfrmStateId) -> XfrmResult<()> {
        (**self).delete_state(id)
    }

    fn delete_policy(&self, id: &XfrmPolicyId) -> XfrmResult<()> {
        (**self).delete_policy(id)
    }
}

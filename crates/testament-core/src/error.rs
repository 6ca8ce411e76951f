//! Errors surfaced by estate operations.
//!
//! Every variant aborts the operation before any state is touched. A failed
//! asset transfer is not an error: it is reported as `Ok(false)`.

use crate::liveness::LivenessState;
use crate::principal::Principal;
use crate::role::Role;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstateError {
    /// Caller lacks the role (or role-admin relationship) the operation needs.
    #[error("Unauthorized: {caller} does not hold {role}")]
    Unauthorized { role: Role, caller: Principal },

    /// Temporal or switch precondition for a liveness transition failed.
    #[error("Conditions not met: {0}")]
    ConditionsNotMet(String),

    /// A notDead/onlyDead guard rejected the operation.
    #[error("Invalid state: {operation} not permitted while {state}")]
    InvalidState {
        state: LivenessState,
        operation: &'static str,
    },

    /// The operation would leave the Owner role without members.
    #[error("Refusing to remove the last Owner")]
    LastOwner,

    #[error("Check-in interval must be positive")]
    InvalidInterval,

    /// A restored snapshot breaks a registry or switch invariant.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Estate lock poisoned")]
    LockPoisoned,
}

impl EstateError {
    pub(crate) fn unauthorized(role: Role, caller: &Principal) -> Self {
        Self::Unauthorized {
            role,
            caller: *caller,
        }
    }
}

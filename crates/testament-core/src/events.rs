//! Notifications emitted by committed estate operations.

use crate::clock::Timestamp;
use crate::principal::Principal;
use crate::role::Role;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// Serde helper for Amount (satoshis as u64)
mod amount_serde {
    use bitcoin::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(amount.to_sat())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sats = u64::deserialize(deserializer)?;
        Ok(Amount::from_sat(sats))
    }
}

/// Events emitted when an operation commits. Failed operations emit nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EstateEvent {
    /// Membership actually changed (idempotent grants emit nothing).
    RoleGranted {
        role: Role,
        account: Principal,
        sender: Principal,
    },

    RoleRevoked {
        role: Role,
        account: Principal,
        sender: Principal,
    },

    /// Someone reported the owner may be dead (state -> Uncertain).
    ReportOfDeath { by: Principal },

    /// Owner confirmed alive (state -> Alive, switch checked in).
    ConfirmationOfLife { by: Principal },

    /// Dead-man's switch fired (state -> Dead).
    ConfirmationOfDeath { by: Principal },

    SwitchConfigured {
        enabled: bool,
        checkin_interval_secs: u64,
    },

    Deposit {
        from: Principal,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },

    /// Best-effort native transfer; `success` is the only failure signal.
    NativeTransfer {
        recipient: Principal,
        #[serde(with = "amount_serde")]
        amount: Amount,
        success: bool,
    },

    TokenTransfer {
        token: Principal,
        recipient: Principal,
        amount: u128,
        success: bool,
    },

    CoOwnerChanged {
        previous: Vec<Principal>,
        new: Option<Principal>,
    },
}

impl EstateEvent {
    /// Stable name, used as the event_log `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            EstateEvent::RoleGranted { .. } => "role_granted",
            EstateEvent::RoleRevoked { .. } => "role_revoked",
            EstateEvent::ReportOfDeath { .. } => "report_of_death",
            EstateEvent::ConfirmationOfLife { .. } => "confirmation_of_life",
            EstateEvent::ConfirmationOfDeath { .. } => "confirmation_of_death",
            EstateEvent::SwitchConfigured { .. } => "switch_configured",
            EstateEvent::Deposit { .. } => "deposit",
            EstateEvent::NativeTransfer { .. } => "native_transfer",
            EstateEvent::TokenTransfer { .. } => "token_transfer",
            EstateEvent::CoOwnerChanged { .. } => "co_owner_changed",
        }
    }

    /// Check if this event records a liveness transition
    pub fn is_liveness_transition(&self) -> bool {
        matches!(
            self,
            EstateEvent::ReportOfDeath { .. }
                | EstateEvent::ConfirmationOfLife { .. }
                | EstateEvent::ConfirmationOfDeath { .. }
        )
    }
}

/// An event with the time it was committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: Timestamp,
    pub event: EstateEvent,
}

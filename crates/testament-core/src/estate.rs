//! The estate authority object.
//!
//! [`Estate`] owns all mutable estate state and is the only way to change
//! it. Every operation takes the calling principal explicitly, checks roles
//! first, then the liveness guard, and only then mutates and records an
//! [`EstateEvent`]. A failing operation returns before touching anything.

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::co_owner::{self, MembershipChange};
use crate::custody::{self, NativeLedger, TokenService};
use crate::error::EstateError;
use crate::events::{EstateEvent, EventRecord};
use crate::heartbeat::{evaluate_heartbeat, HeartbeatConfig, HeartbeatStatus};
use crate::liveness::{DeadManSwitchConfig, Liveness, LivenessState};
use crate::principal::Principal;
use crate::role::{Role, RoleRegistry};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// Persistable estate state: role membership, liveness and switch config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstateState {
    pub roles: RoleRegistry,
    pub liveness: Liveness,
}

impl EstateState {
    /// Fresh state: `owner` is the sole Owner, liveness is Alive.
    pub fn new(owner: Principal) -> Self {
        Self {
            roles: RoleRegistry::new(owner),
            liveness: Liveness::new(),
        }
    }

    /// Check the invariants a restored snapshot must hold before use.
    pub fn validate(&self) -> Result<(), EstateError> {
        self.roles.validate()?;
        self.liveness.validate()
    }
}

pub struct Estate<C: Clock = SystemClock> {
    state: EstateState,
    clock: C,
    journal: Vec<EventRecord>,
}

impl<C: Clock> Estate<C> {
    /// `initializeEstate`: seed `owner` as sole Owner, liveness Alive.
    pub fn initialize(owner: Principal, clock: C) -> Self {
        log::info!("Estate initialized with owner {}", owner.short());
        Self::with_state(EstateState::new(owner), clock)
    }

    /// Restore a previously persisted estate, rejecting snapshots that
    /// break a role or switch invariant.
    pub fn from_state(state: EstateState, clock: C) -> Result<Self, EstateError> {
        state.validate()?;
        Ok(Self::with_state(state, clock))
    }

    fn with_state(state: EstateState, clock: C) -> Self {
        Self {
            state,
            clock,
            journal: Vec::new(),
        }
    }

    pub fn state(&self) -> &EstateState {
        &self.state
    }

    pub fn into_state(self) -> EstateState {
        self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn roles(&self) -> &RoleRegistry {
        &self.state.roles
    }

    pub fn has_role(&self, role: Role, account: &Principal) -> bool {
        self.state.roles.has_role(role, account)
    }

    pub fn role_admin(&self, role: Role) -> Role {
        self.state.roles.role_admin(role)
    }

    pub fn role_member_count(&self, role: Role) -> usize {
        self.state.roles.member_count(role)
    }

    pub fn role_member_at(&self, role: Role, index: usize) -> Option<Principal> {
        self.state.roles.member_at(role, index)
    }

    pub fn liveness(&self) -> LivenessState {
        self.state.liveness.state()
    }

    pub fn switch(&self) -> &DeadManSwitchConfig {
        self.state.liveness.switch()
    }

    /// Heartbeat at the current clock time.
    pub fn heartbeat(&self, config: &HeartbeatConfig) -> HeartbeatStatus {
        evaluate_heartbeat(&self.state.liveness, self.now(), config)
    }

    // ========================================================================
    // Role registry
    // ========================================================================

    pub fn grant_role(
        &mut self,
        caller: &Principal,
        role: Role,
        account: Principal,
    ) -> Result<(), EstateError> {
        if self.state.roles.grant_role(caller, role, account)? {
            log::info!("{} granted to {} by {}", role, account.short(), caller.short());
            self.emit(EstateEvent::RoleGranted {
                role,
                account,
                sender: *caller,
            });
        }
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: &Principal,
        role: Role,
        account: &Principal,
    ) -> Result<(), EstateError> {
        if self.state.roles.revoke_role(caller, role, account)? {
            log::info!("{} revoked from {} by {}", role, account.short(), caller.short());
            self.emit(EstateEvent::RoleRevoked {
                role,
                account: *account,
                sender: *caller,
            });
        }
        Ok(())
    }

    pub fn renounce_role(&mut self, caller: &Principal, role: Role) -> Result<(), EstateError> {
        if self.state.roles.renounce_role(caller, role)? {
            log::info!("{} renounced {}", caller.short(), role);
            self.emit(EstateEvent::RoleRevoked {
                role,
                account: *caller,
                sender: *caller,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Co-owner
    // ========================================================================

    pub fn set_co_owner(
        &mut self,
        caller: &Principal,
        new_co_owner: Option<Principal>,
    ) -> Result<(), EstateError> {
        let previous = self.state.roles.members(Role::CoOwner).to_vec();
        let changes = co_owner::set_co_owner(&mut self.state.roles, caller, new_co_owner)?;
        if changes.is_empty() {
            return Ok(());
        }

        for change in changes {
            let event = match change {
                MembershipChange::Granted(role, account) => EstateEvent::RoleGranted {
                    role,
                    account,
                    sender: *caller,
                },
                MembershipChange::Revoked(role, account) => EstateEvent::RoleRevoked {
                    role,
                    account,
                    sender: *caller,
                },
            };
            self.emit(event);
        }
        log::info!(
            "Co-owner set to {} by {}",
            new_co_owner.map_or_else(|| "<none>".to_string(), |p| p.short()),
            caller.short()
        );
        self.emit(EstateEvent::CoOwnerChanged {
            previous,
            new: new_co_owner,
        });
        Ok(())
    }

    // ========================================================================
    // Liveness
    // ========================================================================

    /// Alive/PlayingDead -> Uncertain. Anyone may report; only the guard applies.
    pub fn report_uncertain(&mut self, caller: &Principal) -> Result<(), EstateError> {
        self.state.liveness.report_uncertain()?;
        log::warn!("Owner reported possibly dead by {}", caller.short());
        self.emit(EstateEvent::ReportOfDeath { by: *caller });
        Ok(())
    }

    /// Any non-Dead state -> Alive; checks in the switch. Owner only.
    pub fn confirm_alive(&mut self, caller: &Principal) -> Result<(), EstateError> {
        self.state.roles.ensure_role(Role::Owner, caller)?;
        let now = self.now();
        self.state.liveness.confirm_alive(now)?;
        log::info!("Owner confirmed alive by {} at {}", caller.short(), now);
        self.emit(EstateEvent::ConfirmationOfLife { by: *caller });
        Ok(())
    }

    /// Permissionless: -> Dead once the switch is enabled and expired.
    pub fn confirm_dead(&mut self, caller: &Principal) -> Result<(), EstateError> {
        let now = self.now();
        self.state.liveness.confirm_dead(now)?;
        log::warn!(
            "Owner confirmed dead at {} (triggered by {})",
            now,
            caller.short()
        );
        self.emit(EstateEvent::ConfirmationOfDeath { by: *caller });
        Ok(())
    }

    pub fn enable_dead_mans_switch(
        &mut self,
        caller: &Principal,
        checkin_interval_secs: u64,
    ) -> Result<(), EstateError> {
        self.state.roles.ensure_role(Role::Owner, caller)?;
        let now = self.now();
        self.state
            .liveness
            .enable_switch(checkin_interval_secs, now)?;
        log::info!(
            "Dead-man's switch enabled: interval {}s, checked in at {}",
            checkin_interval_secs,
            now
        );
        self.emit(EstateEvent::SwitchConfigured {
            enabled: true,
            checkin_interval_secs,
        });
        Ok(())
    }

    pub fn disable_dead_mans_switch(&mut self, caller: &Principal) -> Result<(), EstateError> {
        self.state.roles.ensure_role(Role::Owner, caller)?;
        self.state.liveness.disable_switch()?;
        log::info!("Dead-man's switch disabled by {}", caller.short());
        let checkin_interval_secs = self.switch().checkin_interval_secs;
        self.emit(EstateEvent::SwitchConfigured {
            enabled: false,
            checkin_interval_secs,
        });
        Ok(())
    }

    // ========================================================================
    // Assets
    // ========================================================================

    /// `acceptDeposit`: anyone may fund the estate.
    pub fn accept_deposit(
        &mut self,
        from: &Principal,
        ledger: &mut dyn NativeLedger,
        amount: Amount,
    ) {
        ledger.deposit(from, amount);
        log::debug!("Deposit of {} from {}", amount, from.short());
        self.emit(EstateEvent::Deposit {
            from: *from,
            amount,
        });
    }

    /// Owner only. `Ok(false)` when the transfer itself failed.
    pub fn send_native_currency(
        &mut self,
        caller: &Principal,
        ledger: &mut dyn NativeLedger,
        recipient: &Principal,
        amount: Amount,
    ) -> Result<bool, EstateError> {
        let success =
            custody::send_native_currency(&self.state.roles, caller, ledger, recipient, amount)?;
        self.emit(EstateEvent::NativeTransfer {
            recipient: *recipient,
            amount,
            success,
        });
        Ok(success)
    }

    /// Owner only. Relays the token's boolean result.
    pub fn send_token(
        &mut self,
        caller: &Principal,
        token: &mut dyn TokenService,
        recipient: &Principal,
        amount: u128,
    ) -> Result<bool, EstateError> {
        let success = custody::send_token(&self.state.roles, caller, token, recipient, amount)?;
        self.emit(EstateEvent::TokenTransfer {
            token: token.address(),
            recipient: *recipient,
            amount,
            success,
        });
        Ok(success)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Events committed since the last drain.
    pub fn events(&self) -> &[EventRecord] {
        &self.journal
    }

    /// Take all pending events, oldest first.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.journal)
    }

    fn emit(&mut self, event: EstateEvent) {
        let timestamp = self.now();
        self.journal.push(EventRecord { timestamp, event });
    }
}

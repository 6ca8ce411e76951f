//! Asset custody: Owner-gated native and token transfers.
//!
//! The ledger and token contracts are external collaborators. Transfers are
//! best-effort: a failed transfer returns `Ok(false)` and leaves the estate
//! untouched, so a misbehaving recipient cannot make the call fail.

use crate::error::EstateError;
use crate::principal::Principal;
use crate::role::{Role, RoleRegistry};
use bitcoin::Amount;
use std::collections::{HashMap, HashSet};

/// Native-currency balance held on behalf of the estate.
pub trait NativeLedger {
    fn balance(&self) -> Amount;

    fn deposit(&mut self, from: &Principal, amount: Amount);

    /// Attempt a transfer. Returns `false` (with no balance change) on failure.
    fn transfer(&mut self, recipient: &Principal, amount: Amount) -> bool;
}

/// Third-party fungible token, seen only through its transfer entry point.
pub trait TokenService {
    /// Identity of the token contract.
    fn address(&self) -> Principal;

    fn transfer(&mut self, recipient: &Principal, amount: u128) -> bool;
}

/// `sendNativeCurrency`: Owner only, non-aborting on transfer failure.
pub fn send_native_currency(
    roles: &RoleRegistry,
    caller: &Principal,
    ledger: &mut dyn NativeLedger,
    recipient: &Principal,
    amount: Amount,
) -> Result<bool, EstateError> {
    roles.ensure_role(Role::Owner, caller)?;
    let sent = ledger.transfer(recipient, amount);
    if !sent {
        log::warn!("Native transfer of {} to {} failed", amount, recipient.short());
    }
    Ok(sent)
}

/// `sendToken`: Owner only, relays the token's result unchanged.
pub fn send_token(
    roles: &RoleRegistry,
    caller: &Principal,
    token: &mut dyn TokenService,
    recipient: &Principal,
    amount: u128,
) -> Result<bool, EstateError> {
    roles.ensure_role(Role::Owner, caller)?;
    let sent = token.transfer(recipient, amount);
    if !sent {
        log::warn!(
            "Token {} transfer of {} to {} failed",
            token.address().short(),
            amount,
            recipient.short()
        );
    }
    Ok(sent)
}

// ============================================================================
// In-memory collaborators
// ============================================================================

/// In-memory native ledger. Recipients can be marked as rejecting payments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balance: Amount,
    credited: HashMap<Principal, Amount>,
    rejecting: HashSet<Principal>,
}

impl InMemoryLedger {
    pub fn new(balance: Amount) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Make transfers to `recipient` fail.
    pub fn reject_payments_to(&mut self, recipient: Principal) {
        self.rejecting.insert(recipient);
    }

    /// Total received by `recipient` from the estate.
    pub fn credited(&self, recipient: &Principal) -> Amount {
        self.credited.get(recipient).copied().unwrap_or(Amount::ZERO)
    }
}

impl NativeLedger for InMemoryLedger {
    fn balance(&self) -> Amount {
        self.balance
    }

    fn deposit(&mut self, _from: &Principal, amount: Amount) {
        self.balance = self.balance.checked_add(amount).unwrap_or(Amount::MAX);
    }

    fn transfer(&mut self, recipient: &Principal, amount: Amount) -> bool {
        if self.rejecting.contains(recipient) {
            return false;
        }
        let Some(remaining) = self.balance.checked_sub(amount) else {
            return false;
        };
        self.balance = remaining;
        let entry = self.credited.entry(*recipient).or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount).unwrap_or(Amount::MAX);
        true
    }
}

/// In-memory token holding a balance for the estate.
#[derive(Debug, Clone)]
pub struct InMemoryToken {
    address: Principal,
    estate_balance: u128,
    balances: HashMap<Principal, u128>,
}

impl InMemoryToken {
    pub fn new(address: Principal, estate_balance: u128) -> Self {
        Self {
            address,
            estate_balance,
            balances: HashMap::new(),
        }
    }

    pub fn estate_balance(&self) -> u128 {
        self.estate_balance
    }

    pub fn balance_of(&self, holder: &Principal) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }
}

impl TokenService for InMemoryToken {
    fn address(&self) -> Principal {
        self.address
    }

    fn transfer(&mut self, recipient: &Principal, amount: u128) -> bool {
        let Some(remaining) = self.estate_balance.checked_sub(amount) else {
            return false;
        };
        self.estate_balance = remaining;
        *self.balances.entry(*recipient).or_insert(0) += amount;
        true
    }
}

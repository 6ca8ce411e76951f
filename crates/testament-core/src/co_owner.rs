//! Co-owner rotation.
//!
//! A co-owner (typically an external multi-party approval contract) holds
//! full Owner authority, so CoOwner and Owner membership move together. At
//! most one co-owner is active at a time.

use crate::error::EstateError;
use crate::principal::Principal;
use crate::role::{Role, RoleRegistry};

/// A single membership change made during rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Granted(Role, Principal),
    Revoked(Role, Principal),
}

/// Replace the current co-owner(s) with `new_co_owner`, or clear the slot
/// with `None`.
///
/// Every current CoOwner member loses both CoOwner and Owner. The drain is
/// bounded by the member count at call time. Authorization and the
/// last-Owner check happen before anything is mutated, so a co-owner may
/// rotate itself out.
pub fn set_co_owner(
    roles: &mut RoleRegistry,
    caller: &Principal,
    new_co_owner: Option<Principal>,
) -> Result<Vec<MembershipChange>, EstateError> {
    roles.ensure_role(Role::Owner, caller)?;

    let outgoing: Vec<Principal> = roles.members(Role::CoOwner).to_vec();
    if new_co_owner.is_none() {
        roles.ensure_not_last_owner(Role::Owner, &outgoing)?;
    }

    let mut changes = Vec::new();
    let snapshot = roles.member_count(Role::CoOwner);
    for _ in 0..snapshot {
        let Some(member) = roles.member_at(Role::CoOwner, 0) else {
            break;
        };
        if roles.remove(Role::CoOwner, &member) {
            changes.push(MembershipChange::Revoked(Role::CoOwner, member));
        }
        if roles.remove(Role::Owner, &member) {
            changes.push(MembershipChange::Revoked(Role::Owner, member));
        }
    }

    if let Some(new) = new_co_owner {
        if roles.insert(Role::CoOwner, new) {
            changes.push(MembershipChange::Granted(Role::CoOwner, new));
        }
        if roles.insert(Role::Owner, new) {
            changes.push(MembershipChange::Granted(Role::Owner, new));
        }
    }

    Ok(changes)
}

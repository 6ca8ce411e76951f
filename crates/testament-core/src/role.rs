//! Role registry: who may do what.
//!
//! Four roles, each with a member set and an admin role whose members may
//! grant or revoke it:
//!
//! ```text
//! Owner ──admin of──> Owner, Executor, Beneficiary, CoOwner
//! ```
//!
//! Membership is kept in insertion order and removed by swap, so
//! `member_at` indices are only stable between mutations.

use crate::error::EstateError;
use crate::principal::Principal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Estate roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Executor,
    Beneficiary,
    CoOwner,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Executor, Role::Beneficiary, Role::CoOwner];

    /// Admin role at estate creation. Owner administers itself and every other role.
    pub fn default_admin(self) -> Role {
        Role::Owner
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "Owner",
            Role::Executor => "Executor",
            Role::Beneficiary => "Beneficiary",
            Role::CoOwner => "CoOwner",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RoleData {
    admin: Role,
    members: Vec<Principal>,
}

impl RoleData {
    fn new(role: Role) -> Self {
        Self {
            admin: role.default_admin(),
            members: Vec::new(),
        }
    }
}

/// Role membership and role-admin mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    roles: BTreeMap<Role, RoleData>,
}

impl RoleRegistry {
    /// Create a registry with `owner` as the sole Owner.
    pub fn new(owner: Principal) -> Self {
        let mut roles: BTreeMap<Role, RoleData> =
            Role::ALL.iter().map(|r| (*r, RoleData::new(*r))).collect();
        if let Some(data) = roles.get_mut(&Role::Owner) {
            data.members.push(owner);
        }
        Self { roles }
    }

    pub fn has_role(&self, role: Role, account: &Principal) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|d| d.members.contains(account))
    }

    pub fn role_admin(&self, role: Role) -> Role {
        self.roles
            .get(&role)
            .map(|d| d.admin)
            .unwrap_or_else(|| role.default_admin())
    }

    pub fn member_count(&self, role: Role) -> usize {
        self.roles.get(&role).map_or(0, |d| d.members.len())
    }

    pub fn member_at(&self, role: Role, index: usize) -> Option<Principal> {
        self.roles
            .get(&role)
            .and_then(|d| d.members.get(index).copied())
    }

    pub fn members(&self, role: Role) -> &[Principal] {
        self.roles
            .get(&role)
            .map(|d| d.members.as_slice())
            .unwrap_or(&[])
    }

    /// Fail with `Unauthorized` unless `caller` holds `role`.
    pub fn ensure_role(&self, role: Role, caller: &Principal) -> Result<(), EstateError> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(EstateError::unauthorized(role, caller))
        }
    }

    /// Fail with `Unauthorized` unless `caller` may administer `role`.
    pub fn ensure_admin(&self, role: Role, caller: &Principal) -> Result<(), EstateError> {
        self.ensure_role(self.role_admin(role), caller)
    }

    /// Grant `role` to `account`. Returns `true` if membership changed.
    pub fn grant_role(
        &mut self,
        caller: &Principal,
        role: Role,
        account: Principal,
    ) -> Result<bool, EstateError> {
        self.ensure_admin(role, caller)?;
        Ok(self.insert(role, account))
    }

    /// Revoke `role` from `account`. Returns `true` if membership changed.
    pub fn revoke_role(
        &mut self,
        caller: &Principal,
        role: Role,
        account: &Principal,
    ) -> Result<bool, EstateError> {
        self.ensure_admin(role, caller)?;
        self.ensure_not_last_owner(role, std::slice::from_ref(account))?;
        Ok(self.remove(role, account))
    }

    /// Drop the caller's own membership in `role`. No admin rights needed.
    pub fn renounce_role(&mut self, caller: &Principal, role: Role) -> Result<bool, EstateError> {
        self.ensure_not_last_owner(role, std::slice::from_ref(caller))?;
        Ok(self.remove(role, caller))
    }

    /// Fail with `LastOwner` if removing `accounts` from `role` would leave
    /// Owner with no members.
    pub(crate) fn ensure_not_last_owner(
        &self,
        role: Role,
        accounts: &[Principal],
    ) -> Result<(), EstateError> {
        if role != Role::Owner {
            return Ok(());
        }
        let remaining = self
            .members(Role::Owner)
            .iter()
            .filter(|m| !accounts.contains(m))
            .count();
        if remaining == 0 {
            return Err(EstateError::LastOwner);
        }
        Ok(())
    }

    /// Check a restored registry: every role present with Owner as admin,
    /// no duplicate members, and at least one Owner.
    pub fn validate(&self) -> Result<(), EstateError> {
        for role in Role::ALL {
            let data = self
                .roles
                .get(&role)
                .ok_or_else(|| EstateError::InvalidSnapshot(format!("missing role {}", role)))?;
            if data.admin != role.default_admin() {
                return Err(EstateError::InvalidSnapshot(format!(
                    "{} administered by {}",
                    role, data.admin
                )));
            }
            for (idx, member) in data.members.iter().enumerate() {
                if data.members[..idx].contains(member) {
                    return Err(EstateError::InvalidSnapshot(format!(
                        "duplicate {} member {}",
                        role,
                        member.short()
                    )));
                }
            }
        }
        if self.member_count(Role::Owner) == 0 {
            return Err(EstateError::InvalidSnapshot("no Owner".into()));
        }
        Ok(())
    }

    /// Unchecked insert. Callers are responsible for authorization.
    pub(crate) fn insert(&mut self, role: Role, account: Principal) -> bool {
        let data = self.roles.entry(role).or_insert_with(|| RoleData::new(role));
        if data.members.contains(&account) {
            return false;
        }
        data.members.push(account);
        true
    }

    /// Unchecked removal. Callers are responsible for authorization.
    pub(crate) fn remove(&mut self, role: Role, account: &Principal) -> bool {
        let Some(data) = self.roles.get_mut(&role) else {
            return false;
        };
        match data.members.iter().position(|m| m == account) {
            Some(idx) => {
                data.members.swap_remove(idx);
                true
            }
            None => false,
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Resolved caller identity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// The resolved identity and role set of the entity invoking an operation.
///
/// Produced by the (external) identity layer after token verification and
/// passed explicitly into every core operation. An unresolvable caller is
/// the identity layer's failure to handle; the core assumes the context it
/// receives is authentic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Canonical user id of the caller.
    pub user_id: u64,
    /// The caller's roles (unordered, unique).
    pub roles: BTreeSet<Role>,
}

impl CallerContext {
    /// Create a context with the given roles.
    pub fn new(user_id: u64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Context for a plain account holder.
    pub fn user(user_id: u64) -> Self {
        Self::new(user_id, [Role::User])
    }

    /// Context for an administrator.
    pub fn admin(user_id: u64) -> Self {
        Self::new(user_id, [Role::Admin])
    }

    /// Check whether the caller holds the ADMIN role.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_context_is_admin() {
        assert!(CallerContext::admin(1).is_admin());
        assert!(!CallerContext::user(1).is_admin());
    }

    #[test]
    fn mixed_role_set_is_admin() {
        let caller = CallerContext::new(3, [Role::User, Role::Admin]);
        assert!(caller.is_admin());
    }

    #[test]
    fn duplicate_roles_collapse() {
        let caller = CallerContext::new(5, [Role::User, Role::User]);
        assert_eq!(caller.roles.len(), 1);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! User entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// A stored account identity.
///
/// Users exclusively own their cards. Deleting a user requires its cards to
/// be removed first — an explicit precondition enforced by the user service,
/// not an implicit storage cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub id: u64,
    /// Unique login name.
    pub username: String,
    /// Credential hash, produced and verified by the (external) identity
    /// layer. Stored opaquely; the core never interprets it.
    pub password_hash: String,
    /// Contact email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Role set; mutated only by administrative action.
    pub roles: BTreeSet<Role>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user holds the ADMIN role.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_follows_role_set() {
        let mut user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$2a$10$hash".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Example".to_string(),
            roles: BTreeSet::from([Role::User]),
            created_at: Utc::now(),
        };
        assert!(!user.is_admin());

        user.roles.insert(Role::Admin);
        assert!(user.is_admin());
    }

    #[test]
    fn roles_serialize_as_stored_names() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "h".to_string(),
            email: "a@example.com".to_string(),
            full_name: "Alice".to_string(),
            roles: BTreeSet::from([Role::Admin, Role::User]),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains(r#""ADMIN""#));
        assert!(json.contains(r#""USER""#));
    }
}

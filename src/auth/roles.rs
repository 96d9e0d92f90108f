// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// User roles for authorization.
///
/// The catalog is closed and seeded once: roles are never created at
/// runtime by normal flows, and a user's role set mutates only through
/// administrative action.
///
/// - `Admin` - full access to every card and user
/// - `User` - account holder, limited to their own cards
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Account holder (owns cards)
    User,
}

impl Role {
    /// Parse a role from its stored name (case-insensitive).
    pub fn from_name(s: &str) -> Option<Role> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

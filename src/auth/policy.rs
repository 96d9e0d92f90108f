// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Access policy predicates.
//!
//! Pure functions over `(caller, resource owner, requested action)` — no
//! storage reads, no side effects. Services call the relevant predicate
//! before any state change and translate `false` into a `Forbidden` error.

use crate::model::CardStatus;

use super::context::CallerContext;

/// Admins may view any card; account holders only their own.
pub fn can_view_card(caller: &CallerContext, card_owner_id: u64) -> bool {
    caller.is_admin() || caller.user_id == card_owner_id
}

/// Listing another user's cards follows the same rule as viewing one.
pub fn can_list_cards_for(caller: &CallerContext, target_user_id: u64) -> bool {
    caller.is_admin() || caller.user_id == target_user_id
}

/// Admins may set any status; owners may only request BLOCKED.
pub fn can_set_status(
    caller: &CallerContext,
    card_owner_id: u64,
    requested: CardStatus,
) -> bool {
    caller.is_admin()
        || (caller.user_id == card_owner_id && requested == CardStatus::Blocked)
}

/// Cards are created for oneself unless the caller is an admin.
pub fn can_create_card_for(caller: &CallerContext, requested_owner_id: Option<u64>) -> bool {
    match requested_owner_id {
        None => true,
        Some(owner_id) => owner_id == caller.user_id || caller.is_admin(),
    }
}

/// Card deletion is an administrative operation.
pub fn can_delete_card(caller: &CallerContext) -> bool {
    caller.is_admin()
}

/// The all-cards view is an administrative operation.
pub fn can_list_all_cards(caller: &CallerContext) -> bool {
    caller.is_admin()
}

/// User management (create, list, role changes, deletion) is admin-only.
pub fn can_manage_users(caller: &CallerContext) -> bool {
    caller.is_admin()
}

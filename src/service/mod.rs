// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! # Core Services
//!
//! The operations the (external) transport layer calls into:
//!
//! - [`cards`] — card lifecycle: list, get, create, status update, delete.
//! - [`transfer`] — atomic fund movement between two cards of one owner.
//! - [`users`] — administrative user management.
//!
//! Every operation takes an explicit [`crate::auth::CallerContext`] and
//! consults the access policy before touching state. Card numbers leave
//! these services only decrypted-then-masked, never in clear text.

pub mod cards;
pub mod transfer;
pub mod users;

pub use cards::{CardQuery, CardService, CardView, CreateCardRequest, Page, SortDir, SortKey};
pub use transfer::{TransferOutcome, TransferService};
pub use users::{NewUser, UserService, UserView};

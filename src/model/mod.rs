// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! # Domain Entities
//!
//! Stored records and their invariants:
//!
//! - [`User`] — account identity; exclusively owns its cards.
//! - [`Card`] — encrypted number, status, non-negative decimal balance.
//! - [`CardTransaction`] — immutable transfer record; holds soft (id-only)
//!   references to the two cards involved.
//!
//! Records serialize to JSON for storage; the card number field only ever
//! holds ciphertext.

pub mod card;
pub mod transaction;
pub mod user;

pub use card::{Card, CardStatus};
pub use transaction::CardTransaction;
pub use user::User;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! # Persistence Gateway
//!
//! Embedded storage for users, cards, and the transfer log, backed by redb
//! (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized User
//! - `username_index`: username → user id
//! - `email_index`: email → user id
//! - `cards`: card id → serialized Card
//! - `card_number_index`: ciphertext → card id (uniqueness as a point
//!   lookup, never a table scan)
//! - `owner_card_index`: (owner id, card id) → () for per-owner range scans
//! - `card_transactions`: transaction id → serialized CardTransaction
//!   (append-only)
//! - `sequences`: sequence name → last issued id
//!
//! ## Consistency Model
//!
//! Every mutation runs inside one redb write transaction; an error before
//! commit aborts the whole unit. redb admits a single writer at a time, so
//! concurrent transfers are fully ordered and each sees the previous one's
//! committed balances — there is no per-row lock ordering to get wrong.
//! Reads use MVCC snapshots and never block the writer.

pub mod cards;
pub mod store;
pub mod transactions;
pub mod users;

pub use cards::{CardRepository, NewCardRecord};
pub use store::{CardStore, StoreError};
pub use transactions::TransactionRepository;
pub use users::{NewUserRecord, UserRepository};

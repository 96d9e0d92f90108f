// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Database handle, table definitions, and id allocation.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary user table: user id → serialized User (JSON bytes).
pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Index: login name → user id.
pub(crate) const USERNAME_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("username_index");

/// Index: email → user id.
pub(crate) const EMAIL_INDEX: TableDefinition<&str, u64> = TableDefinition::new("email_index");

/// Primary card table: card id → serialized Card (JSON bytes).
pub(crate) const CARDS: TableDefinition<u64, &[u8]> = TableDefinition::new("cards");

/// Index: encrypted card number → card id.
///
/// Uniqueness of the (deterministic) ciphertext is enforced here with a
/// point lookup inside the creating transaction.
pub(crate) const CARD_NUMBER_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("card_number_index");

/// Index: (owner id, card id) → (), for per-owner range scans.
pub(crate) const OWNER_CARD_INDEX: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("owner_card_index");

/// Append-only transfer log: transaction id → serialized CardTransaction.
pub(crate) const CARD_TRANSACTIONS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("card_transactions");

/// Sequence counters: name → last issued id.
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence names.
pub(crate) const USER_SEQ: &str = "users";
pub(crate) const CARD_SEQ: &str = "cards";
pub(crate) const TRANSACTION_SEQ: &str = "card_transactions";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unique-key violation (duplicate card number, username, email).
    #[error("{0}")]
    AlreadyExists(String),

    /// A documented storage precondition was violated.
    #[error("{0}")]
    Constraint(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// CardStore
// =============================================================================

/// Embedded ACID store for the card core.
///
/// Shared across threads behind `Arc`; redb serializes writers internally.
pub struct CardStore {
    pub(crate) db: Database,
}

impl CardStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(CARDS)?;
            let _ = write_txn.open_table(CARD_NUMBER_INDEX)?;
            let _ = write_txn.open_table(OWNER_CARD_INDEX)?;
            let _ = write_txn.open_table(CARD_TRANSACTIONS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Allocate the next id from a named sequence.
    ///
    /// Must run inside the same write transaction as the insert consuming
    /// the id, so an aborted insert never burns a visible gap.
    pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
        let mut table = txn.open_table(SEQUENCES)?;
        let next = table.get(sequence)?.map(|g| g.value()).unwrap_or(0) + 1;
        table.insert(sequence, next)?;
        Ok(next)
    }
}

// =============================================================================
// Record Codec
// =============================================================================

/// Serialize a record for storage.
pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a stored record.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (CardStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CardStore::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn open_precreates_tables() {
        use redb::ReadableDatabase;

        let (store, _dir) = temp_store();
        let read_txn = store.db.begin_read().unwrap();
        let table = read_txn.open_table(CARDS).unwrap();
        assert_eq!(table.iter().unwrap().count(), 0);
    }

    #[test]
    fn sequences_are_monotonic_per_name() {
        let (store, _dir) = temp_store();

        let txn = store.db.begin_write().unwrap();
        assert_eq!(CardStore::next_id(&txn, CARD_SEQ).unwrap(), 1);
        assert_eq!(CardStore::next_id(&txn, CARD_SEQ).unwrap(), 2);
        assert_eq!(CardStore::next_id(&txn, USER_SEQ).unwrap(), 1);
        txn.commit().unwrap();

        let txn = store.db.begin_write().unwrap();
        assert_eq!(CardStore::next_id(&txn, CARD_SEQ).unwrap(), 3);
        txn.commit().unwrap();
    }

    #[test]
    fn aborted_transaction_does_not_advance_sequences() {
        let (store, _dir) = temp_store();

        let txn = store.db.begin_write().unwrap();
        assert_eq!(CardStore::next_id(&txn, CARD_SEQ).unwrap(), 1);
        drop(txn); // abort

        let txn = store.db.begin_write().unwrap();
        assert_eq!(CardStore::next_id(&txn, CARD_SEQ).unwrap(), 1);
        txn.commit().unwrap();
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Read access to the append-only transfer log.
//!
//! Records are written only by the transfer transaction in
//! [`super::CardRepository::transfer`]; nothing updates or deletes them.

use redb::{ReadableDatabase, ReadableTable};

use crate::error::CoreResult;
use crate::model::CardTransaction;

use super::store::{decode, CardStore, StoreError, CARD_TRANSACTIONS};

/// Repository over the transfer log.
pub struct TransactionRepository<'a> {
    store: &'a CardStore,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(store: &'a CardStore) -> Self {
        Self { store }
    }

    /// Look up a transfer record by id.
    pub fn find_by_id(&self, transaction_id: u64) -> CoreResult<Option<CardTransaction>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let log = read_txn
            .open_table(CARD_TRANSACTIONS)
            .map_err(StoreError::from)?;
        match log.get(transaction_id).map_err(StoreError::from)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Every record involving the given card, as source or destination,
    /// ordered by transaction id ascending.
    pub fn list_by_card(&self, card_id: u64) -> CoreResult<Vec<CardTransaction>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let log = read_txn
            .open_table(CARD_TRANSACTIONS)
            .map_err(StoreError::from)?;
        let mut records = Vec::new();
        for entry in log.iter().map_err(StoreError::from)? {
            let (_, value) = entry.map_err(StoreError::from)?;
            let record: CardTransaction = decode(value.value())?;
            if record.from_card_id == card_id || record.to_card_id == card_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// The whole log, ordered by transaction id ascending.
    pub fn list_all(&self) -> CoreResult<Vec<CardTransaction>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let log = read_txn
            .open_table(CARD_TRANSACTIONS)
            .map_err(StoreError::from)?;
        let mut records = Vec::new();
        for entry in log.iter().map_err(StoreError::from)? {
            let (_, value) = entry.map_err(StoreError::from)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Transfer engine.
//!
//! Validates and atomically executes a balance movement between two cards
//! of the same owner, producing an immutable transaction record. The checks
//! run in a fixed order — the first failing check determines the error the
//! caller sees — and execute inside the storage write transaction, so a
//! failed check mutates nothing and two concurrent transfers can never both
//! pass a balance check against the same stale value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::CallerContext;
use crate::crypto::{mask_card_number, CardNumberCipher};
use crate::error::{CoreError, CoreResult};
use crate::model::CardStatus;
use crate::storage::{CardRepository, CardStore};

/// Result of a committed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub transaction_id: u64,
    pub from_card_id: u64,
    pub from_masked_number: String,
    pub to_card_id: u64,
    pub to_masked_number: String,
    pub amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Fund movement between a caller's own cards.
pub struct TransferService<'a> {
    store: &'a CardStore,
    cipher: &'a CardNumberCipher,
}

impl<'a> TransferService<'a> {
    pub fn new(store: &'a CardStore, cipher: &'a CardNumberCipher) -> Self {
        Self { store, cipher }
    }

    /// Move `amount` from one of the caller's cards to another.
    ///
    /// Check order:
    /// 1. both cards exist (NotFound)
    /// 2. caller owns both (Forbidden; no admin override)
    /// 3. distinct cards (BadRequest)
    /// 4./5. both stored statuses are ACTIVE (BadRequest)
    /// 6. neither card's derived status is EXPIRED (BadRequest)
    /// 7. amount is positive and covered by the source balance (BadRequest)
    ///
    /// Then debit, credit, and one log record, all in the same transaction.
    pub fn transfer(
        &self,
        caller: &CallerContext,
        from_card_id: u64,
        to_card_id: u64,
        amount: Decimal,
    ) -> CoreResult<TransferOutcome> {
        let now = Utc::now();
        let today = now.date_naive();
        let caller_id = caller.user_id;

        let (from_card, to_card, record) = CardRepository::new(self.store).transfer(
            from_card_id,
            to_card_id,
            amount,
            now,
            |from, to| {
                if from.owner_id != caller_id || to.owner_id != caller_id {
                    return Err(CoreError::forbidden(
                        "You can only transfer between your own cards",
                    ));
                }
                if from.id == to.id {
                    return Err(CoreError::bad_request("Cannot transfer to the same card"));
                }
                if from.status != CardStatus::Active {
                    return Err(CoreError::bad_request("From card is not active"));
                }
                if to.status != CardStatus::Active {
                    return Err(CoreError::bad_request("To card is not active"));
                }
                if from.effective_status(today) == CardStatus::Expired {
                    return Err(CoreError::bad_request("From card has expired"));
                }
                if to.effective_status(today) == CardStatus::Expired {
                    return Err(CoreError::bad_request("To card has expired"));
                }
                // The boundary validator already rejects non-positive
                // amounts; re-checked here so the invariant does not depend
                // on the caller.
                if amount <= Decimal::ZERO {
                    return Err(CoreError::bad_request("Transfer amount must be positive"));
                }
                if from.balance < amount {
                    return Err(CoreError::bad_request("Insufficient funds"));
                }
                Ok(())
            },
        )?;

        tracing::info!(
            transaction_id = record.id,
            from_card_id,
            to_card_id,
            amount = %record.amount,
            "transfer committed"
        );

        Ok(TransferOutcome {
            transaction_id: record.id,
            from_card_id: from_card.id,
            from_masked_number: mask_card_number(
                &self.cipher.decrypt(&from_card.encrypted_number)?,
            ),
            to_card_id: to_card.id,
            to_masked_number: mask_card_number(&self.cipher.decrypt(&to_card.encrypted_number)?),
            amount: record.amount,
            executed_at: record.executed_at,
        })
    }
}

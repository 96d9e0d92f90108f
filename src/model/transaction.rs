// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Immutable transfer record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Record of one committed transfer.
///
/// Created only by a successful transfer execution; never updated or
/// deleted. The card references are soft — plain ids, not storage-level
/// links — so the log survives later deletion of either card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardTransaction {
    /// Unique transaction id.
    pub id: u64,
    /// Card the funds left.
    pub from_card_id: u64,
    /// Card the funds arrived on.
    pub to_card_id: u64,
    /// Transferred amount; strictly positive.
    pub amount: Decimal,
    /// When the transfer committed.
    pub executed_at: DateTime<Utc>,
}

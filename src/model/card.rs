// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Card entity and status rules.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Card status.
///
/// Transitions are monotonic toward terminal states except by administrator
/// override: an account holder may only request `Active` → `Blocked`; an
/// admin may set any value. `Expired` is usually derived at read time (see
/// [`Card::effective_status`]) rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardStatus {
    /// Card can send and receive funds.
    Active,
    /// Card is blocked; sticky over expiry.
    Blocked,
    /// Card is past its expiry date.
    Expired,
}

impl CardStatus {
    /// Parse a status from its stored name (case-insensitive).
    pub fn from_name(s: &str) -> Option<CardStatus> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(CardStatus::Active),
            "BLOCKED" => Some(CardStatus::Blocked),
            "EXPIRED" => Some(CardStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStatus::Active => write!(f, "ACTIVE"),
            CardStatus::Blocked => write!(f, "BLOCKED"),
            CardStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A stored banking card.
///
/// Invariants maintained by the services and the store:
/// - `balance` is never negative.
/// - `encrypted_number` is ciphertext, unique across all cards.
/// - Exactly one owning user; deleting the card does not delete the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Unique card id.
    pub id: u64,
    /// Encrypted card number (base64 token). Never plaintext.
    pub encrypted_number: String,
    /// Cardholder display name.
    pub cardholder_name: String,
    /// Expiry date; the card is unusable strictly after this date.
    pub expiry_date: NaiveDate,
    /// Last persisted status. Readers report [`Card::effective_status`].
    pub status: CardStatus,
    /// Current balance.
    pub balance: Decimal,
    /// Owning user id.
    pub owner_id: u64,
    /// When the card was created.
    pub created_at: DateTime<Utc>,
    /// When the card was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Whether the card is past its expiry date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.expiry_date
    }

    /// The status reported to callers.
    ///
    /// An expired card reports `Expired` even while the stored value still
    /// says `Active`; `Blocked` is sticky and wins over expiry. The stored
    /// value is only rewritten by an explicit status update, never by reads,
    /// so every reader derives the same answer from the same expiry date.
    pub fn effective_status(&self, today: NaiveDate) -> CardStatus {
        if self.status != CardStatus::Blocked && self.is_expired(today) {
            CardStatus::Expired
        } else {
            self.status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(status: CardStatus, expiry: NaiveDate) -> Card {
        Card {
            id: 1,
            encrypted_number: "dG9rZW4=".to_string(),
            cardholder_name: "JOHN DOE".to_string(),
            expiry_date: expiry,
            status,
            balance: Decimal::ZERO,
            owner_id: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn active_card_within_expiry_stays_active() {
        let c = card(CardStatus::Active, date(2030, 1, 31));
        assert_eq!(c.effective_status(date(2026, 6, 1)), CardStatus::Active);
    }

    #[test]
    fn expiry_day_itself_is_still_valid() {
        let c = card(CardStatus::Active, date(2026, 6, 1));
        assert!(!c.is_expired(date(2026, 6, 1)));
        assert!(c.is_expired(date(2026, 6, 2)));
    }

    #[test]
    fn stored_active_past_expiry_reports_expired() {
        let c = card(CardStatus::Active, date(2020, 1, 1));
        assert_eq!(c.status, CardStatus::Active);
        assert_eq!(c.effective_status(date(2026, 6, 1)), CardStatus::Expired);
    }

    #[test]
    fn blocked_is_sticky_over_expiry() {
        let c = card(CardStatus::Blocked, date(2020, 1, 1));
        assert_eq!(c.effective_status(date(2026, 6, 1)), CardStatus::Blocked);
    }

    #[test]
    fn status_parses_from_stored_name() {
        assert_eq!(CardStatus::from_name("active"), Some(CardStatus::Active));
        assert_eq!(CardStatus::from_name("BLOCKED"), Some(CardStatus::Blocked));
        assert_eq!(CardStatus::from_name("frozen"), None);
    }

    #[test]
    fn serde_uses_uppercase_names() {
        let json = serde_json::to_string(&CardStatus::Active).unwrap();
        assert_eq!(json, r#""ACTIVE""#);
    }
}

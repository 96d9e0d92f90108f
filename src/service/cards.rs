// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Card lifecycle manager.
//!
//! Owns create / read / list / status-update / delete for cards, enforcing
//! ownership and role rules and delegating confidentiality to the cipher
//! and masker. Decryption happens only here, at the response boundary, and
//! the result is always masked before it leaves.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::{policy, CallerContext};
use crate::crypto::{mask_card_number, CardNumberCipher};
use crate::error::{CoreError, CoreResult};
use crate::model::{Card, CardStatus};
use crate::storage::{CardRepository, CardStore, NewCardRecord, UserRepository};

/// Display-safe card representation: the number is masked and the status is
/// the derived (effective) one.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub id: u64,
    pub masked_number: String,
    pub cardholder_name: String,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    pub balance: Decimal,
    pub owner_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sort key for card listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    CardholderName,
    ExpiryDate,
    Balance,
    CreatedAt,
}

/// Sort direction for card listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Listing parameters: optional filters, pagination, ordering.
///
/// Defaults mirror the external interface: page 0, size 10, id descending.
#[derive(Debug, Clone)]
pub struct CardQuery {
    /// Case-insensitive substring match on the cardholder name.
    pub cardholder_name: Option<String>,
    /// Exact match on the effective (derived) status.
    pub status: Option<CardStatus>,
    pub page: usize,
    pub size: usize,
    pub sort_key: SortKey,
    pub sort_dir: SortDir,
}

impl Default for CardQuery {
    fn default() -> Self {
        Self {
            cardholder_name: None,
            status: None,
            page: 0,
            size: 10,
            sort_key: SortKey::default(),
            sort_dir: SortDir::default(),
        }
    }
}

/// One stable page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    /// Total matching items across all pages.
    pub total: usize,
}

/// Fields for a card creation request.
#[derive(Debug, Clone)]
pub struct CreateCardRequest {
    /// Explicit owner; absent means the caller themselves.
    pub owner_id: Option<u64>,
    /// Plain 16-digit card number. Encrypted before it reaches storage.
    pub card_number: String,
    pub cardholder_name: String,
    pub expiry_date: NaiveDate,
}

/// Card lifecycle operations.
pub struct CardService<'a> {
    store: &'a CardStore,
    cipher: &'a CardNumberCipher,
}

impl<'a> CardService<'a> {
    pub fn new(store: &'a CardStore, cipher: &'a CardNumberCipher) -> Self {
        Self { store, cipher }
    }

    fn cards(&self) -> CardRepository<'_> {
        CardRepository::new(self.store)
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store)
    }

    fn view(&self, card: &Card, today: NaiveDate) -> CoreResult<CardView> {
        let plain = self.cipher.decrypt(&card.encrypted_number)?;
        Ok(CardView {
            id: card.id,
            masked_number: mask_card_number(&plain),
            cardholder_name: card.cardholder_name.clone(),
            expiry_date: card.expiry_date,
            status: card.effective_status(today),
            balance: card.balance,
            owner_id: card.owner_id,
            created_at: card.created_at,
            updated_at: card.updated_at,
        })
    }

    /// List a user's cards with filters, ordering, and offset pagination.
    ///
    /// `owner_id` of `None` means the caller's own cards. Admins may list
    /// anyone's.
    pub fn list(
        &self,
        caller: &CallerContext,
        owner_id: Option<u64>,
        query: &CardQuery,
    ) -> CoreResult<Page<CardView>> {
        let target = owner_id.unwrap_or(caller.user_id);
        if !policy::can_list_cards_for(caller, target) {
            return Err(CoreError::forbidden(
                "Access denied: You can only view your own cards",
            ));
        }
        if self.users().find_by_id(target)?.is_none() {
            return Err(CoreError::not_found("User", target));
        }

        let today = Utc::now().date_naive();
        let mut cards = self.cards().list_by_owner(target)?;

        if let Some(name) = query.cardholder_name.as_deref().filter(|n| !n.is_empty()) {
            let needle = name.to_lowercase();
            cards.retain(|c| c.cardholder_name.to_lowercase().contains(&needle));
        }
        if let Some(status) = query.status {
            cards.retain(|c| c.effective_status(today) == status);
        }

        sort_cards(&mut cards, query.sort_key, query.sort_dir);

        let total = cards.len();
        let items = cards
            .into_iter()
            .skip(query.page.saturating_mul(query.size))
            .take(query.size)
            .map(|c| self.view(&c, today))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Page {
            items,
            page: query.page,
            size: query.size,
            total,
        })
    }

    /// Fetch one card by id.
    pub fn get_by_id(&self, caller: &CallerContext, card_id: u64) -> CoreResult<CardView> {
        let card = self
            .cards()
            .find_by_id(card_id)?
            .ok_or_else(|| CoreError::not_found("Card", card_id))?;
        if !policy::can_view_card(caller, card.owner_id) {
            return Err(CoreError::forbidden(
                "Access denied: You can only view your own cards",
            ));
        }
        self.view(&card, Utc::now().date_naive())
    }

    /// Create a card. Starts ACTIVE with zero balance.
    pub fn create(
        &self,
        caller: &CallerContext,
        request: CreateCardRequest,
    ) -> CoreResult<CardView> {
        if !policy::can_create_card_for(caller, request.owner_id) {
            return Err(CoreError::forbidden(
                "Only admins can create cards for other users",
            ));
        }
        let owner_id = request.owner_id.unwrap_or(caller.user_id);

        if request.card_number.len() != 16
            || !request.card_number.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(CoreError::bad_request(
                "Card number must be exactly 16 digits",
            ));
        }

        let now = Utc::now();
        let today = now.date_naive();
        if request.expiry_date < today {
            return Err(CoreError::bad_request("Expiry date cannot be in the past"));
        }

        let encrypted_number = self.cipher.encrypt(&request.card_number);
        let card = self.cards().create(NewCardRecord {
            encrypted_number,
            cardholder_name: request.cardholder_name,
            expiry_date: request.expiry_date,
            owner_id,
            created_at: now,
        })?;

        tracing::info!(card_id = card.id, owner_id, "card created");
        self.view(&card, today)
    }

    /// Change a card's status. No other field changes.
    pub fn update_status(
        &self,
        caller: &CallerContext,
        card_id: u64,
        new_status: CardStatus,
    ) -> CoreResult<CardView> {
        let card = self
            .cards()
            .find_by_id(card_id)?
            .ok_or_else(|| CoreError::not_found("Card", card_id))?;

        if !policy::can_set_status(caller, card.owner_id, new_status) {
            let message = if caller.user_id != card.owner_id {
                "Access denied: You can only manage your own cards"
            } else {
                "You can only request to block your card"
            };
            return Err(CoreError::forbidden(message));
        }

        let updated = self.cards().update_status(card_id, new_status, Utc::now())?;
        tracing::info!(card_id, status = %new_status, "card status updated");
        self.view(&updated, Utc::now().date_naive())
    }

    /// Permanently delete a card. Admin only.
    pub fn delete(&self, caller: &CallerContext, card_id: u64) -> CoreResult<()> {
        let card = self
            .cards()
            .find_by_id(card_id)?
            .ok_or_else(|| CoreError::not_found("Card", card_id))?;
        if !policy::can_delete_card(caller) {
            return Err(CoreError::forbidden("Only admins can delete cards"));
        }

        self.cards().delete(card.id)?;
        tracing::info!(card_id, owner_id = card.owner_id, "card deleted");
        Ok(())
    }

    /// Every card in the system. Admin only.
    pub fn list_all(&self, caller: &CallerContext) -> CoreResult<Vec<CardView>> {
        if !policy::can_list_all_cards(caller) {
            return Err(CoreError::forbidden("Only admins can view all cards"));
        }
        let today = Utc::now().date_naive();
        self.cards()
            .list_all()?
            .iter()
            .map(|c| self.view(c, today))
            .collect()
    }
}

fn sort_cards(cards: &mut [Card], key: SortKey, dir: SortDir) {
    cards.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::CardholderName => a
                .cardholder_name
                .to_lowercase()
                .cmp(&b.cardholder_name.to_lowercase()),
            SortKey::ExpiryDate => a.expiry_date.cmp(&b.expiry_date),
            SortKey::Balance => a.balance.cmp(&b.balance),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Card repository and the atomic transfer primitive.

use chrono::{DateTime, NaiveDate, Utc};
use redb::{ReadableDatabase, ReadableTable};
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::model::{Card, CardStatus, CardTransaction};

use super::store::{
    decode, encode, CardStore, StoreError, CARDS, CARD_NUMBER_INDEX, CARD_SEQ, CARD_TRANSACTIONS,
    OWNER_CARD_INDEX, TRANSACTION_SEQ, USERS,
};

/// Fields for a card about to be created.
///
/// The number arrives already encrypted; plaintext never crosses the
/// storage boundary.
#[derive(Debug, Clone)]
pub struct NewCardRecord {
    pub encrypted_number: String,
    pub cardholder_name: String,
    pub expiry_date: NaiveDate,
    pub owner_id: u64,
    pub created_at: DateTime<Utc>,
}

/// Repository for card records.
pub struct CardRepository<'a> {
    store: &'a CardStore,
}

impl<'a> CardRepository<'a> {
    pub fn new(store: &'a CardStore) -> Self {
        Self { store }
    }

    /// Indexed existence check for an encrypted card number.
    ///
    /// A point lookup on `card_number_index` — never a table scan.
    pub fn number_exists(&self, encrypted_number: &str) -> CoreResult<bool> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let index = read_txn
            .open_table(CARD_NUMBER_INDEX)
            .map_err(StoreError::from)?;
        Ok(index
            .get(encrypted_number)
            .map_err(StoreError::from)?
            .is_some())
    }

    /// Insert a new card with zero balance and ACTIVE status.
    ///
    /// The uniqueness check, the owner-existence check, and the inserts all
    /// share one write transaction: two racing creates with the same number
    /// cannot both commit, and a card cannot be created for a user a
    /// concurrent transaction is deleting.
    pub fn create(&self, new: NewCardRecord) -> CoreResult<Card> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let card = {
            {
                let users = txn.open_table(USERS).map_err(StoreError::from)?;
                if users
                    .get(new.owner_id)
                    .map_err(StoreError::from)?
                    .is_none()
                {
                    return Err(CoreError::not_found("User", new.owner_id));
                }
            }

            let mut number_index = txn
                .open_table(CARD_NUMBER_INDEX)
                .map_err(StoreError::from)?;
            if number_index
                .get(new.encrypted_number.as_str())
                .map_err(StoreError::from)?
                .is_some()
            {
                return Err(StoreError::AlreadyExists(
                    "Card with this number already exists".to_string(),
                )
                .into());
            }

            let id = CardStore::next_id(&txn, CARD_SEQ)?;
            let card = Card {
                id,
                encrypted_number: new.encrypted_number,
                cardholder_name: new.cardholder_name,
                expiry_date: new.expiry_date,
                status: CardStatus::Active,
                balance: Decimal::ZERO,
                owner_id: new.owner_id,
                created_at: new.created_at,
                updated_at: new.created_at,
            };

            number_index
                .insert(card.encrypted_number.as_str(), id)
                .map_err(StoreError::from)?;
            drop(number_index);

            let mut cards = txn.open_table(CARDS).map_err(StoreError::from)?;
            cards
                .insert(id, encode(&card)?.as_slice())
                .map_err(StoreError::from)?;
            drop(cards);

            let mut owner_index = txn.open_table(OWNER_CARD_INDEX).map_err(StoreError::from)?;
            owner_index
                .insert((card.owner_id, id), ())
                .map_err(StoreError::from)?;
            drop(owner_index);

            card
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(card)
    }

    /// Look up a card by id.
    pub fn find_by_id(&self, card_id: u64) -> CoreResult<Option<Card>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let cards = read_txn.open_table(CARDS).map_err(StoreError::from)?;
        match cards.get(card_id).map_err(StoreError::from)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All cards of one owner, ordered by card id ascending.
    pub fn list_by_owner(&self, owner_id: u64) -> CoreResult<Vec<Card>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let owner_index = read_txn
            .open_table(OWNER_CARD_INDEX)
            .map_err(StoreError::from)?;
        let cards_table = read_txn.open_table(CARDS).map_err(StoreError::from)?;

        let mut cards = Vec::new();
        for entry in owner_index
            .range((owner_id, u64::MIN)..=(owner_id, u64::MAX))
            .map_err(StoreError::from)?
        {
            let (key, _) = entry.map_err(StoreError::from)?;
            let (_, card_id) = key.value();
            if let Some(guard) = cards_table.get(card_id).map_err(StoreError::from)? {
                cards.push(decode(guard.value())?);
            }
        }
        Ok(cards)
    }

    /// Every card in the store, ordered by id ascending.
    ///
    /// Snapshot read; does not block writers.
    pub fn list_all(&self) -> CoreResult<Vec<Card>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let cards_table = read_txn.open_table(CARDS).map_err(StoreError::from)?;
        let mut cards = Vec::new();
        for entry in cards_table.iter().map_err(StoreError::from)? {
            let (_, value) = entry.map_err(StoreError::from)?;
            cards.push(decode(value.value())?);
        }
        Ok(cards)
    }

    /// Persist a new status for a card. No other field changes.
    pub fn update_status(
        &self,
        card_id: u64,
        status: CardStatus,
        now: DateTime<Utc>,
    ) -> CoreResult<Card> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let card = {
            let mut cards = txn.open_table(CARDS).map_err(StoreError::from)?;
            let bytes = {
                let guard = cards
                    .get(card_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("Card", card_id))?;
                guard.value().to_vec()
            };
            let mut card: Card = decode(&bytes)?;
            card.status = status;
            card.updated_at = now;
            cards
                .insert(card_id, encode(&card)?.as_slice())
                .map_err(StoreError::from)?;
            card
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(card)
    }

    /// Permanently remove a card and its index entries.
    ///
    /// Transaction-log rows referencing the card are left untouched; they
    /// hold soft references and remain the historical record.
    pub fn delete(&self, card_id: u64) -> CoreResult<Card> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let card = {
            let mut cards = txn.open_table(CARDS).map_err(StoreError::from)?;
            let card: Card = {
                let removed = cards
                    .remove(card_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("Card", card_id))?;
                decode(removed.value())?
            };
            drop(cards);

            let mut number_index = txn
                .open_table(CARD_NUMBER_INDEX)
                .map_err(StoreError::from)?;
            number_index
                .remove(card.encrypted_number.as_str())
                .map_err(StoreError::from)?;
            drop(number_index);

            let mut owner_index = txn.open_table(OWNER_CARD_INDEX).map_err(StoreError::from)?;
            owner_index
                .remove((card.owner_id, card.id))
                .map_err(StoreError::from)?;
            drop(owner_index);

            card
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(card)
    }

    /// Atomically move `amount` between two cards and append the transfer
    /// record.
    ///
    /// Both cards are loaded inside the write transaction and handed to
    /// `check` for the ordered business validations; any error aborts the
    /// transaction with no balance mutation and no record. redb serializes
    /// writers, so the balances `check` sees are the latest committed ones —
    /// two concurrent transfers cannot both pass a balance check against the
    /// same stale value.
    pub fn transfer(
        &self,
        from_card_id: u64,
        to_card_id: u64,
        amount: Decimal,
        now: DateTime<Utc>,
        check: impl FnOnce(&Card, &Card) -> CoreResult<()>,
    ) -> CoreResult<(Card, Card, CardTransaction)> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let outcome = {
            let mut cards = txn.open_table(CARDS).map_err(StoreError::from)?;

            let from_bytes = {
                let guard = cards
                    .get(from_card_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("Card", from_card_id))?;
                guard.value().to_vec()
            };
            let to_bytes = {
                let guard = cards
                    .get(to_card_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("Card", to_card_id))?;
                guard.value().to_vec()
            };

            let mut from_card: Card = decode(&from_bytes)?;
            let mut to_card: Card = decode(&to_bytes)?;

            check(&from_card, &to_card)?;

            from_card.balance -= amount;
            from_card.updated_at = now;
            to_card.balance += amount;
            to_card.updated_at = now;

            cards
                .insert(from_card_id, encode(&from_card)?.as_slice())
                .map_err(StoreError::from)?;
            cards
                .insert(to_card_id, encode(&to_card)?.as_slice())
                .map_err(StoreError::from)?;
            drop(cards);

            let transaction_id = CardStore::next_id(&txn, TRANSACTION_SEQ)?;
            let record = CardTransaction {
                id: transaction_id,
                from_card_id,
                to_card_id,
                amount,
                executed_at: now,
            };

            let mut log = txn.open_table(CARD_TRANSACTIONS).map_err(StoreError::from)?;
            log.insert(transaction_id, encode(&record)?.as_slice())
                .map_err(StoreError::from)?;
            drop(log);

            (from_card, to_card, record)
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(outcome)
    }

    /// Set a card's balance directly, bypassing the transfer engine.
    ///
    /// Test seeding only; production balances change exclusively through
    /// [`CardRepository::transfer`].
    #[cfg(test)]
    pub(crate) fn set_balance_for_tests(
        &self,
        card_id: u64,
        balance: Decimal,
    ) -> CoreResult<()> {
        self.mutate_for_tests(card_id, |card| card.balance = balance)
    }

    /// Backdate a card's expiry. Test seeding only.
    #[cfg(test)]
    pub(crate) fn set_expiry_for_tests(
        &self,
        card_id: u64,
        expiry_date: NaiveDate,
    ) -> CoreResult<()> {
        self.mutate_for_tests(card_id, |card| card.expiry_date = expiry_date)
    }

    #[cfg(test)]
    fn mutate_for_tests(&self, card_id: u64, mutate: impl FnOnce(&mut Card)) -> CoreResult<()> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        {
            let mut cards = txn.open_table(CARDS).map_err(StoreError::from)?;
            let bytes = {
                let guard = cards
                    .get(card_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("Card", card_id))?;
                guard.value().to_vec()
            };
            let mut card: Card = decode(&bytes)?;
            mutate(&mut card);
            cards
                .insert(card_id, encode(&card)?.as_slice())
                .map_err(StoreError::from)?;
        }
        txn.commit().map_err(StoreError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::users::{NewUserRecord, UserRepository};
    use std::collections::BTreeSet;

    fn temp_store() -> (CardStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CardStore::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    fn seed_user(store: &CardStore, username: &str) -> u64 {
        UserRepository::new(store)
            .create(NewUserRecord {
                username: username.to_string(),
                password_hash: "$2a$10$hash".to_string(),
                email: format!("{username}@example.com"),
                full_name: username.to_string(),
                roles: BTreeSet::from([Role::User]),
                created_at: Utc::now(),
            })
            .unwrap()
            .id
    }

    fn new_card(owner_id: u64, token: &str) -> NewCardRecord {
        NewCardRecord {
            encrypted_number: token.to_string(),
            cardholder_name: "TEST HOLDER".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            owner_id,
            created_at: Utc::now(),
        }
    }

    fn set_balance(store: &CardStore, card_id: u64, balance: &str) {
        CardRepository::new(store)
            .set_balance_for_tests(card_id, balance.parse().unwrap())
            .unwrap();
    }

    #[test]
    fn create_and_find_card() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        let card = repo.create(new_card(owner, "token-a")).unwrap();
        assert_eq!(card.id, 1);
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.balance, Decimal::ZERO);

        let loaded = repo.find_by_id(card.id).unwrap().unwrap();
        assert_eq!(loaded.encrypted_number, "token-a");
        assert_eq!(loaded.owner_id, owner);
    }

    #[test]
    fn duplicate_number_is_rejected() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        repo.create(new_card(owner, "token-a")).unwrap();
        let err = repo.create(new_card(owner, "token-a")).unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
        assert!(repo.number_exists("token-a").unwrap());
        assert!(!repo.number_exists("token-b").unwrap());
    }

    #[test]
    fn create_for_missing_owner_is_not_found() {
        let (store, _dir) = temp_store();
        let repo = CardRepository::new(&store);
        let err = repo.create(new_card(99, "token-a")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn list_by_owner_uses_the_index() {
        let (store, _dir) = temp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let repo = CardRepository::new(&store);

        repo.create(new_card(alice, "token-a1")).unwrap();
        repo.create(new_card(alice, "token-a2")).unwrap();
        repo.create(new_card(bob, "token-b1")).unwrap();

        let alices = repo.list_by_owner(alice).unwrap();
        assert_eq!(alices.len(), 2);
        assert!(alices.iter().all(|c| c.owner_id == alice));

        assert_eq!(repo.list_by_owner(bob).unwrap().len(), 1);
        assert_eq!(repo.list_all().unwrap().len(), 3);
    }

    #[test]
    fn delete_frees_the_number_for_reuse() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        let card = repo.create(new_card(owner, "token-a")).unwrap();
        repo.delete(card.id).unwrap();

        assert!(repo.find_by_id(card.id).unwrap().is_none());
        assert!(!repo.number_exists("token-a").unwrap());
        assert!(repo.list_by_owner(owner).unwrap().is_empty());
        // Same number can be issued again
        repo.create(new_card(owner, "token-a")).unwrap();
    }

    #[test]
    fn transfer_moves_funds_and_appends_record() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        let a = repo.create(new_card(owner, "token-a")).unwrap();
        let b = repo.create(new_card(owner, "token-b")).unwrap();
        set_balance(&store, a.id, "1000.00");

        let amount: Decimal = "200.00".parse().unwrap();
        let (from, to, record) = repo
            .transfer(a.id, b.id, amount, Utc::now(), |_, _| Ok(()))
            .unwrap();

        assert_eq!(from.balance, "800.00".parse::<Decimal>().unwrap());
        assert_eq!(to.balance, "200.00".parse::<Decimal>().unwrap());
        assert_eq!(record.amount, amount);
        assert_eq!(record.from_card_id, a.id);
        assert_eq!(record.to_card_id, b.id);
    }

    #[test]
    fn failed_check_rolls_back_everything() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        let a = repo.create(new_card(owner, "token-a")).unwrap();
        let b = repo.create(new_card(owner, "token-b")).unwrap();
        set_balance(&store, a.id, "1000.00");

        let err = repo
            .transfer(a.id, b.id, "200.00".parse().unwrap(), Utc::now(), |_, _| {
                Err(CoreError::bad_request("Insufficient funds"))
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        // Balances untouched, no record appended
        let a_after = repo.find_by_id(a.id).unwrap().unwrap();
        let b_after = repo.find_by_id(b.id).unwrap().unwrap();
        assert_eq!(a_after.balance, "1000.00".parse::<Decimal>().unwrap());
        assert_eq!(b_after.balance, Decimal::ZERO);

        let log = crate::storage::TransactionRepository::new(&store);
        assert!(log.list_all().unwrap().is_empty());
    }

    #[test]
    fn transfer_to_missing_card_is_not_found() {
        let (store, _dir) = temp_store();
        let owner = seed_user(&store, "alice");
        let repo = CardRepository::new(&store);

        let a = repo.create(new_card(owner, "token-a")).unwrap();
        let err = repo
            .transfer(a.id, 99, "1.00".parse().unwrap(), Utc::now(), |_, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { id: 99, .. }));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! User repository.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};

use crate::auth::Role;
use crate::error::{CoreError, CoreResult};
use crate::model::User;

use super::store::{
    decode, encode, CardStore, StoreError, EMAIL_INDEX, OWNER_CARD_INDEX, USERNAME_INDEX, USERS,
    USER_SEQ,
};

/// Fields for a user about to be created.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

/// Repository for user records.
pub struct UserRepository<'a> {
    store: &'a CardStore,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a CardStore) -> Self {
        Self { store }
    }

    /// Insert a new user, enforcing username and email uniqueness.
    ///
    /// Uniqueness checks and the insert share one write transaction, so two
    /// racing creates with the same username cannot both commit.
    pub fn create(&self, new: NewUserRecord) -> CoreResult<User> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let user = {
            let mut username_index = txn.open_table(USERNAME_INDEX).map_err(StoreError::from)?;
            if username_index
                .get(new.username.as_str())
                .map_err(StoreError::from)?
                .is_some()
            {
                return Err(StoreError::AlreadyExists(format!(
                    "Username already exists: {}",
                    new.username
                ))
                .into());
            }

            let mut email_index = txn.open_table(EMAIL_INDEX).map_err(StoreError::from)?;
            if email_index
                .get(new.email.as_str())
                .map_err(StoreError::from)?
                .is_some()
            {
                return Err(StoreError::AlreadyExists(format!(
                    "Email already exists: {}",
                    new.email
                ))
                .into());
            }

            let id = CardStore::next_id(&txn, USER_SEQ)?;
            let user = User {
                id,
                username: new.username,
                password_hash: new.password_hash,
                email: new.email,
                full_name: new.full_name,
                roles: new.roles,
                created_at: new.created_at,
            };

            username_index
                .insert(user.username.as_str(), id)
                .map_err(StoreError::from)?;
            email_index
                .insert(user.email.as_str(), id)
                .map_err(StoreError::from)?;
            drop(username_index);
            drop(email_index);

            let mut users = txn.open_table(USERS).map_err(StoreError::from)?;
            users
                .insert(id, encode(&user)?.as_slice())
                .map_err(StoreError::from)?;
            drop(users);

            user
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(user)
    }

    /// Look up a user by id.
    pub fn find_by_id(&self, user_id: u64) -> CoreResult<Option<User>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let users = read_txn.open_table(USERS).map_err(StoreError::from)?;
        match users.get(user_id).map_err(StoreError::from)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by login name.
    pub fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let index = read_txn.open_table(USERNAME_INDEX).map_err(StoreError::from)?;
        let id = match index.get(username).map_err(StoreError::from)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        let users = read_txn.open_table(USERS).map_err(StoreError::from)?;
        match users.get(id).map_err(StoreError::from)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All users, ordered by id.
    pub fn list_all(&self) -> CoreResult<Vec<User>> {
        let read_txn = self.store.db.begin_read().map_err(StoreError::from)?;
        let users = read_txn.open_table(USERS).map_err(StoreError::from)?;
        let mut result = Vec::new();
        for entry in users.iter().map_err(StoreError::from)? {
            let (_, value) = entry.map_err(StoreError::from)?;
            result.push(decode(value.value())?);
        }
        Ok(result)
    }

    /// Replace a user's role set.
    pub fn update_roles(&self, user_id: u64, roles: BTreeSet<Role>) -> CoreResult<User> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        let user = {
            let mut users = txn.open_table(USERS).map_err(StoreError::from)?;
            let bytes = {
                let guard = users
                    .get(user_id)
                    .map_err(StoreError::from)?
                    .ok_or_else(|| CoreError::not_found("User", user_id))?;
                guard.value().to_vec()
            };
            let mut user: User = decode(&bytes)?;
            user.roles = roles;
            users
                .insert(user_id, encode(&user)?.as_slice())
                .map_err(StoreError::from)?;
            user
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(user)
    }

    /// Delete a user.
    ///
    /// Precondition: the user owns no cards. The check shares the delete's
    /// write transaction, so a concurrent card create for this user either
    /// commits before (delete fails) or after (create fails on the missing
    /// owner) — an orphan card cannot appear.
    pub fn delete(&self, user_id: u64) -> CoreResult<()> {
        let txn = self.store.db.begin_write().map_err(StoreError::from)?;
        {
            let owner_index = txn.open_table(OWNER_CARD_INDEX).map_err(StoreError::from)?;
            let mut owned = owner_index
                .range((user_id, u64::MIN)..=(user_id, u64::MAX))
                .map_err(StoreError::from)?;
            if owned.next().is_some() {
                return Err(StoreError::Constraint(format!(
                    "Cannot delete user {user_id}: user still owns cards"
                ))
                .into());
            }
            drop(owned);
            drop(owner_index);

            let mut users = txn.open_table(USERS).map_err(StoreError::from)?;
            let removed = users
                .remove(user_id)
                .map_err(StoreError::from)?
                .ok_or_else(|| CoreError::not_found("User", user_id))?;
            let user: User = decode(removed.value())?;
            drop(removed);
            drop(users);

            let mut username_index = txn.open_table(USERNAME_INDEX).map_err(StoreError::from)?;
            username_index
                .remove(user.username.as_str())
                .map_err(StoreError::from)?;
            drop(username_index);

            let mut email_index = txn.open_table(EMAIL_INDEX).map_err(StoreError::from)?;
            email_index
                .remove(user.email.as_str())
                .map_err(StoreError::from)?;
        }
        txn.commit().map_err(StoreError::from)?;
        Ok(())
    }
}

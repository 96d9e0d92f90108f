// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Administrative user management.
//!
//! Registration and credential verification belong to the (external)
//! identity layer; these operations cover the administrative side: creating
//! accounts, inspecting them, changing role sets, and deleting them.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;

use crate::auth::{policy, CallerContext, Role};
use crate::error::{CoreError, CoreResult};
use crate::model::User;
use crate::storage::{CardStore, NewUserRecord, UserRepository};

/// Fields for an account about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Credential hash produced by the identity layer; stored opaquely.
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    /// Roles for the new account; empty means the default USER role.
    pub roles: BTreeSet<Role>,
}

/// User representation returned to callers. Never carries the credential
/// hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: BTreeSet<Role>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            roles: user.roles,
        }
    }
}

/// User management operations. All admin-only.
pub struct UserService<'a> {
    store: &'a CardStore,
}

impl<'a> UserService<'a> {
    pub fn new(store: &'a CardStore) -> Self {
        Self { store }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store)
    }

    fn require_admin(&self, caller: &CallerContext) -> CoreResult<()> {
        if policy::can_manage_users(caller) {
            Ok(())
        } else {
            Err(CoreError::forbidden("Only admins can manage users"))
        }
    }

    /// Create an account. Username and email must be unique.
    pub fn create(&self, caller: &CallerContext, new: NewUser) -> CoreResult<UserView> {
        self.require_admin(caller)?;

        let roles = if new.roles.is_empty() {
            BTreeSet::from([Role::User])
        } else {
            new.roles
        };

        let user = self.users().create(NewUserRecord {
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            full_name: new.full_name,
            roles,
            created_at: Utc::now(),
        })?;

        tracing::info!(user_id = user.id, username = %user.username, "user created");
        Ok(user.into())
    }

    /// Fetch one account by id.
    pub fn get(&self, caller: &CallerContext, user_id: u64) -> CoreResult<UserView> {
        self.require_admin(caller)?;
        let user = self
            .users()
            .find_by_id(user_id)?
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        Ok(user.into())
    }

    /// All accounts, ordered by id.
    pub fn list(&self, caller: &CallerContext) -> CoreResult<Vec<UserView>> {
        self.require_admin(caller)?;
        Ok(self
            .users()
            .list_all()?
            .into_iter()
            .map(UserView::from)
            .collect())
    }

    /// Replace an account's role set.
    pub fn set_roles(
        &self,
        caller: &CallerContext,
        user_id: u64,
        roles: BTreeSet<Role>,
    ) -> CoreResult<UserView> {
        self.require_admin(caller)?;
        if roles.is_empty() {
            return Err(CoreError::bad_request("User must have at least one role"));
        }
        let user = self.users().update_roles(user_id, roles)?;
        tracing::info!(user_id, "user roles updated");
        Ok(user.into())
    }

    /// Delete an account.
    ///
    /// Precondition: the user owns no cards. Cards must be deleted (or
    /// reassigned by recreating them) first; there is no implicit cascade.
    pub fn delete(&self, caller: &CallerContext, user_id: u64) -> CoreResult<()> {
        self.require_admin(caller)?;
        self.users().delete(user_id)?;
        tracing::info!(user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CardNumberCipher;
    use crate::error::ErrorKind;
    use crate::service::cards::{CardService, CreateCardRequest};
    use chrono::NaiveDate;

    struct Fixture {
        store: CardStore,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = CardStore::open(&dir.path().join("test.redb")).unwrap();
            Self { store, _dir: dir }
        }

        fn service(&self) -> UserService<'_> {
            UserService::new(&self.store)
        }

        fn new_user(username: &str) -> NewUser {
            NewUser {
                username: username.to_string(),
                password_hash: "$2a$10$hash".to_string(),
                email: format!("{username}@example.com"),
                full_name: format!("{username} example"),
                roles: BTreeSet::new(),
            }
        }
    }

    #[test]
    fn create_defaults_to_user_role_and_hides_credentials() {
        let fx = Fixture::new();
        let admin = CallerContext::admin(1);

        let view = fx.service().create(&admin, Fixture::new_user("alice")).unwrap();
        assert_eq!(view.roles, BTreeSet::from([Role::User]));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn management_is_admin_only() {
        let fx = Fixture::new();
        let admin = CallerContext::admin(1);
        let plain = CallerContext::user(2);
        let service = fx.service();

        let created = service.create(&admin, Fixture::new_user("alice")).unwrap();

        assert_eq!(
            service
                .create(&plain, Fixture::new_user("bob"))
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            service.get(&plain, created.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            service.list(&plain).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            service.delete(&plain, created.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn set_roles_promotes_and_requires_non_empty_set() {
        let fx = Fixture::new();
        let admin = CallerContext::admin(1);
        let service = fx.service();

        let created = service.create(&admin, Fixture::new_user("alice")).unwrap();
        let updated = service
            .set_roles(&admin, created.id, BTreeSet::from([Role::Admin, Role::User]))
            .unwrap();
        assert!(updated.roles.contains(&Role::Admin));

        let err = service
            .set_roles(&admin, created.id, BTreeSet::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn delete_requires_cards_to_be_removed_first() {
        let fx = Fixture::new();
        let admin = CallerContext::admin(1);
        let service = fx.service();

        let created = service.create(&admin, Fixture::new_user("alice")).unwrap();

        let cipher = CardNumberCipher::new("test-cipher-secret");
        let cards = CardService::new(&fx.store, &cipher);
        let card = cards
            .create(
                &CallerContext::user(created.id),
                CreateCardRequest {
                    owner_id: None,
                    card_number: "1234567890123456".to_string(),
                    cardholder_name: "ALICE".to_string(),
                    expiry_date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
                },
            )
            .unwrap();

        let err = service.delete(&admin, created.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(service.get(&admin, created.id).is_ok());

        cards.delete(&admin, card.id).unwrap();
        service.delete(&admin, created.id).unwrap();
        assert_eq!(
            service.get(&admin, created.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn list_returns_all_accounts() {
        let fx = Fixture::new();
        let admin = CallerContext::admin(1);
        let service = fx.service();

        service.create(&admin, Fixture::new_user("alice")).unwrap();
        service.create(&admin, Fixture::new_user("bob")).unwrap();

        let users = service.list(&admin).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[1].username, "bob");
    }
}

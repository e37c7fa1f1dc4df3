//! Directory of referral participants keyed by user identifier.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use referral_core::UserId;
use referral_graph::User;

use crate::referral_store::StoreError;

/// Keyed store of users seen by the referral program.
pub trait UserDirectory: Send + Sync {
    /// Insert `user` if absent. An existing record is kept as-is.
    fn save(&self, user: User) -> Result<(), StoreError>;

    fn get(&self, id: UserId) -> Result<User, StoreError>;

    /// Overwrite an existing record; `NotFound` if the user was never saved.
    fn update(&self, user: User) -> Result<(), StoreError>;
}

impl<D> UserDirectory for Arc<D>
where
    D: UserDirectory + ?Sized,
{
    fn save(&self, user: User) -> Result<(), StoreError> {
        (**self).save(user)
    }

    fn get(&self, id: UserId) -> Result<User, StoreError> {
        (**self).get(id)
    }

    fn update(&self, user: User) -> Result<(), StoreError> {
        (**self).update(user)
    }
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl UserDirectory for InMemoryUserDirectory {
    fn save(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.entry(user.id_typed()).or_insert(user);
        Ok(())
    }

    fn get(&self, id: UserId) -> Result<User, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        users.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn update(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let id = user.id_typed();
        let existing = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        *existing = user;
        Ok(())
    }
}

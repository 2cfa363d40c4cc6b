use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ContactRepository, Lookup, UserRepository};
use crate::database::models::{Contact, ContactModel, NewUser, User};
use crate::database::DatabaseError;
use crate::services::birthdays::is_upcoming;
use crate::services::search::{contact_matches, normalize_query};
use crate::services::Clock;

#[derive(Default)]
struct ContactTable {
    last_id: i32,
    // BTreeMap keeps rows in id order, which is insertion order.
    rows: BTreeMap<i32, Contact>,
}

/// Process-local contact store with the same ownership rules as the SQL one.
pub struct MemoryContactRepository {
    table: RwLock<ContactTable>,
    clock: Arc<dyn Clock>,
    birthday_window_days: i64,
}

impl MemoryContactRepository {
    pub fn new(clock: Arc<dyn Clock>, birthday_window_days: i64) -> Self {
        Self {
            table: RwLock::new(ContactTable::default()),
            clock,
            birthday_window_days,
        }
    }

    async fn owned_by(&self, user: &User) -> Vec<Contact> {
        let table = self.table.read().await;
        table
            .rows
            .values()
            .filter(|c| c.user_id == user.id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContactRepository for MemoryContactRepository {
    async fn create_contact(
        &self,
        data: &ContactModel,
        user: &User,
    ) -> Result<Contact, DatabaseError> {
        let mut table = self.table.write().await;
        let id = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| DatabaseError::QueryError("contact id sequence exhausted".to_string()))?;
        table.last_id = id;

        let contact = Contact {
            id,
            name: data.name.clone(),
            surname: data.surname.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            birthday: data.birthday,
            notes: data.notes.clone(),
            user_id: user.id,
        };
        table.rows.insert(id, contact.clone());
        Ok(contact)
    }

    async fn get_contacts(
        &self,
        limit: i64,
        offset: i64,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError> {
        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self.owned_by(user).await.into_iter().skip(skip).take(take).collect())
    }

    async fn get_contact_by_id(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .get(&contact_id)
            .filter(|c| c.user_id == user.id)
            .cloned()
            .into())
    }

    async fn update_contact(
        &self,
        data: &ContactModel,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&contact_id) {
            Some(contact) if contact.user_id == user.id => {
                contact.replace_with(data);
                Ok(Lookup::Found(contact.clone()))
            }
            _ => Ok(Lookup::Absent),
        }
    }

    async fn remove_contact(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let mut table = self.table.write().await;
        let owned = table
            .rows
            .get(&contact_id)
            .map(|c| c.user_id == user.id)
            .unwrap_or(false);
        if !owned {
            return Ok(Lookup::Absent);
        }
        Ok(table.rows.remove(&contact_id).into())
    }

    async fn search_contacts(
        &self,
        query: &str,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError> {
        let Some(needle) = normalize_query(query) else {
            return Ok(Vec::new());
        };
        Ok(self
            .owned_by(user)
            .await
            .into_iter()
            .filter(|c| contact_matches(c, &needle))
            .collect())
    }

    async fn get_contacts_birthdays(&self, user: &User) -> Result<Vec<Contact>, DatabaseError> {
        let today = self.clock.today();
        Ok(self
            .owned_by(user)
            .await
            .into_iter()
            .filter(|c| is_upcoming(c.birthday, today, self.birthday_window_days))
            .collect())
    }
}

#[derive(Default)]
struct UserTable {
    last_id: i32,
    rows: BTreeMap<i32, User>,
}

#[derive(Default)]
pub struct MemoryUserRepository {
    table: RwLock<UserTable>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict("Account already exists".to_string()));
        }
        let id = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| DatabaseError::QueryError("user id sequence exhausted".to_string()))?;
        table.last_id = id;

        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            refresh_token: None,
            created_at: Utc::now(),
        };
        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Lookup<User>, DatabaseError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned().into())
    }

    async fn update_token(
        &self,
        user: &User,
        token_digest: Option<String>,
    ) -> Result<(), DatabaseError> {
        let mut table = self.table.write().await;
        if let Some(stored) = table.rows.get_mut(&user.id) {
            stored.refresh_token = token_digest;
        }
        Ok(())
    }
}

//! Storage ports for contacts and users.
//!
//! Every contact operation takes the requesting [`User`] and only ever sees
//! rows that user owns. A row that exists but belongs to someone else is
//! reported exactly like a row that does not exist: [`Lookup::Absent`].

use async_trait::async_trait;

use crate::database::models::{Contact, ContactModel, NewUser, User};
use crate::database::DatabaseError;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryContactRepository, MemoryUserRepository};
pub use postgres::{PgContactRepository, PgUserRepository};

/// Outcome of a lookup that ran successfully. Storage failures travel in the
/// surrounding `Result` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    pub fn ok_or_else<E>(self, err: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::Absent => Err(err()),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::Absent,
        }
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Insert a contact owned by `user`.
    async fn create_contact(
        &self,
        data: &ContactModel,
        user: &User,
    ) -> Result<Contact, DatabaseError>;

    /// Page through `user`'s contacts in id order.
    async fn get_contacts(
        &self,
        limit: i64,
        offset: i64,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError>;

    async fn get_contact_by_id(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError>;

    /// Replace every mutable field.
    async fn update_contact(
        &self,
        data: &ContactModel,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError>;

    /// Delete permanently, yielding the row as it was.
    async fn remove_contact(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError>;

    /// Case-insensitive substring search over name, surname and email.
    async fn search_contacts(
        &self,
        query: &str,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError>;

    /// Contacts whose next birthday falls in the configured window from today.
    async fn get_contacts_birthdays(&self, user: &User) -> Result<Vec<Contact>, DatabaseError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DatabaseError::Conflict` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Lookup<User>, DatabaseError>;

    /// Store (or clear) the digest of the user's current refresh token.
    async fn update_token(
        &self,
        user: &User,
        token_digest: Option<String>,
    ) -> Result<(), DatabaseError>;
}

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{ContactRepository, Lookup, UserRepository};
use crate::database::models::{Contact, ContactModel, NewUser, User};
use crate::database::DatabaseError;
use crate::services::birthdays::is_upcoming;
use crate::services::search::normalize_query;
use crate::services::Clock;

const CONTACT_COLUMNS: &str = "id, name, surname, email, phone, birthday, notes, user_id";
const USER_COLUMNS: &str = "id, username, email, password_hash, refresh_token, created_at";

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Contacts stored in PostgreSQL.
///
/// Reads check a connection out of the pool for the duration of one call.
/// Writes run inside a transaction; an early return drops it uncommitted, which
/// rolls it back, so a failed write leaves nothing behind.
pub struct PgContactRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    birthday_window_days: i64,
}

impl PgContactRepository {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, birthday_window_days: i64) -> Self {
        Self {
            pool,
            clock,
            birthday_window_days,
        }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create_contact(
        &self,
        data: &ContactModel,
        user: &User,
    ) -> Result<Contact, DatabaseError> {
        let sql = format!(
            "INSERT INTO contacts (name, surname, email, phone, birthday, notes, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            CONTACT_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(&data.name)
            .bind(&data.surname)
            .bind(&data.email)
            .bind(&data.phone)
            .bind(data.birthday)
            .bind(&data.notes)
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Created contact {} for user {}", contact.id, user.id);
        Ok(contact)
    }

    async fn get_contacts(
        &self,
        limit: i64,
        offset: i64,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            CONTACT_COLUMNS
        );

        let mut conn = self.pool.acquire().await?;
        let contacts = sqlx::query_as::<_, Contact>(&sql)
            .bind(user.id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await?;

        Ok(contacts)
    }

    async fn get_contact_by_id(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE id = $1 AND user_id = $2",
            CONTACT_COLUMNS
        );

        let mut conn = self.pool.acquire().await?;
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(contact_id)
            .bind(user.id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(contact.into())
    }

    async fn update_contact(
        &self,
        data: &ContactModel,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let sql = format!(
            "UPDATE contacts \
             SET name = $1, surname = $2, email = $3, phone = $4, birthday = $5, notes = $6 \
             WHERE id = $7 AND user_id = $8 RETURNING {}",
            CONTACT_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(&data.name)
            .bind(&data.surname)
            .bind(&data.email)
            .bind(&data.phone)
            .bind(data.birthday)
            .bind(&data.notes)
            .bind(contact_id)
            .bind(user.id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(contact.into())
    }

    async fn remove_contact(
        &self,
        contact_id: i32,
        user: &User,
    ) -> Result<Lookup<Contact>, DatabaseError> {
        let sql = format!(
            "DELETE FROM contacts WHERE id = $1 AND user_id = $2 RETURNING {}",
            CONTACT_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(contact_id)
            .bind(user.id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        if contact.is_some() {
            debug!("Removed contact {} for user {}", contact_id, user.id);
        }
        Ok(contact.into())
    }

    async fn search_contacts(
        &self,
        query: &str,
        user: &User,
    ) -> Result<Vec<Contact>, DatabaseError> {
        let Some(needle) = normalize_query(query) else {
            return Ok(Vec::new());
        };
        let pattern = format!("%{}%", escape_like(&needle));

        let sql = format!(
            r"SELECT {} FROM contacts WHERE user_id = $1 AND (
                name ILIKE $2 ESCAPE '\' OR surname ILIKE $2 ESCAPE '\' OR email ILIKE $2 ESCAPE '\'
            ) ORDER BY id",
            CONTACT_COLUMNS
        );

        let mut conn = self.pool.acquire().await?;
        let contacts = sqlx::query_as::<_, Contact>(&sql)
            .bind(user.id)
            .bind(pattern)
            .fetch_all(&mut *conn)
            .await?;

        Ok(contacts)
    }

    async fn get_contacts_birthdays(&self, user: &User) -> Result<Vec<Contact>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY id",
            CONTACT_COLUMNS
        );

        let mut conn = self.pool.acquire().await?;
        let contacts = sqlx::query_as::<_, Contact>(&sql)
            .bind(user.id)
            .fetch_all(&mut *conn)
            .await?;

        let today = self.clock.today();
        Ok(contacts
            .into_iter()
            .filter(|c| is_upcoming(c.birthday, today, self.birthday_window_days))
            .collect())
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_write(e, "Account"))?;
        tx.commit().await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Lookup<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user.into())
    }

    async fn update_token(
        &self,
        user: &User,
        token_digest: Option<String>,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
            .bind(token_digest)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

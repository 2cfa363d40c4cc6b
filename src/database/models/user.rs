use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::contact::validate_email_format;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;

/// Stored account. Hashes never serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Signup payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModel {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserModel {
    pub fn validate(&self) -> Result<(), std::collections::HashMap<String, String>> {
        let mut errors = std::collections::HashMap::new();

        let username_len = self.username.trim().chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
            errors.insert(
                "username".to_string(),
                format!(
                    "Username must be between {} and {} characters",
                    USERNAME_MIN_LEN, USERNAME_MAX_LEN
                ),
            );
        }
        if let Err(msg) = validate_email_format(self.email.trim()) {
            errors.insert("email".to_string(), msg);
        }
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            errors.insert(
                "password".to_string(),
                format!("Password must be at least {} characters", PASSWORD_MIN_LEN),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Fields needed to insert a user once the password is hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const NAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 100;
pub const PHONE_MIN_LEN: usize = 3;
pub const PHONE_MAX_LEN: usize = 20;
pub const NOTES_MAX_LEN: usize = 500;

/// A persisted address-book entry. `user_id` is the owner and never leaves the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    pub notes: Option<String>,
    #[serde(skip_serializing, default)]
    pub user_id: i32,
}

impl Contact {
    /// Overwrite every mutable field; id and owner stay put.
    pub fn replace_with(&mut self, data: &ContactModel) {
        self.name = data.name.clone();
        self.surname = data.surname.clone();
        self.email = data.email.clone();
        self.phone = data.phone.clone();
        self.birthday = data.birthday;
        self.notes = data.notes.clone();
    }
}

/// Request body for create and full-replacement update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactModel {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ContactModel {
    /// Trim surrounding whitespace and collapse a blank note to `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.surname = self.surname.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }

    /// Field-level checks. `today` bounds the birthday.
    pub fn validate(&self, today: NaiveDate) -> Result<(), HashMap<String, String>> {
        let mut errors = HashMap::new();

        if let Err(msg) = validate_name(&self.name) {
            errors.insert("name".to_string(), msg);
        }
        if let Err(msg) = validate_name(&self.surname) {
            errors.insert("surname".to_string(), msg);
        }
        if let Err(msg) = validate_email_format(&self.email) {
            errors.insert("email".to_string(), msg);
        }
        if let Err(msg) = validate_phone(&self.phone) {
            errors.insert("phone".to_string(), msg);
        }
        if self.birthday > today {
            errors.insert("birthday".to_string(), "Birthday cannot be in the future".to_string());
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > NOTES_MAX_LEN {
                errors.insert(
                    "notes".to_string(),
                    format!("Notes must be at most {} characters", NOTES_MAX_LEN),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_name(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("This field is required".to_string());
    }
    if value.chars().count() > NAME_MAX_LEN {
        return Err(format!("Must be at most {} characters", NAME_MAX_LEN));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), String> {
    let len = phone.chars().count();
    if !(PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&len) {
        return Err(format!(
            "Phone must be between {} and {} characters",
            PHONE_MIN_LEN, PHONE_MAX_LEN
        ));
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'))
    {
        return Err("Phone may only contain digits, spaces and + - ( ) .".to_string());
    }
    if !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err("Phone must contain at least one digit".to_string());
    }
    Ok(())
}

/// Basic email validation shared by contacts and user signup.
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(format!("Email must be at most {} characters", EMAIL_MAX_LEN));
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err("Invalid email format".to_string()),
    };
    if local.is_empty() || domain.is_empty() {
        return Err("Invalid email format".to_string());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

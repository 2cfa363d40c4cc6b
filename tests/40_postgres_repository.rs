//! Runs the SQL adapters against a live PostgreSQL. Skipped unless DATABASE_URL
//! is set (a `.env` file is honoured, like the server does).

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use contacts_api::config::{DatabaseConfig, StorageBackend};
use contacts_api::database::models::{Contact, ContactModel, NewUser, User};
use contacts_api::database::{DatabaseError, DatabaseManager};
use contacts_api::repository::{
    ContactRepository, PgContactRepository, PgUserRepository, UserRepository,
};
use contacts_api::services::FixedClock;

struct PgFixture {
    pool: PgPool,
    users: PgUserRepository,
    contacts: PgContactRepository,
    created: Vec<i32>,
}

impl PgFixture {
    /// `None` when no database is configured.
    async fn connect() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping postgres repository test");
            return Ok(None);
        };

        let pool = DatabaseManager::connect(&DatabaseConfig {
            backend: StorageBackend::Postgres,
            url: Some(url),
            max_connections: 4,
            connection_timeout: 10,
        })
        .await?;
        DatabaseManager::ensure_schema(&pool).await?;

        let clock = Arc::new(FixedClock(d(2024, 12, 28)));
        Ok(Some(Self {
            users: PgUserRepository::new(pool.clone()),
            contacts: PgContactRepository::new(pool.clone(), clock, 7),
            pool,
            created: Vec::new(),
        }))
    }

    /// A fresh account with an email no other run can collide with.
    async fn user(&mut self, tag: &str) -> Result<User> {
        let stamp = Utc::now().timestamp_micros();
        let user = self
            .users
            .create_user(NewUser {
                username: tag.to_string(),
                email: format!("{}-{}-{}@pg.test", tag, std::process::id(), stamp),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await?;
        self.created.push(user.id);
        Ok(user)
    }

    /// Contacts go with their owner (ON DELETE CASCADE).
    async fn cleanup(self) -> Result<()> {
        for id in &self.created {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        self.pool.close().await;
        Ok(())
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn model(name: &str, surname: &str, email: &str, birthday: NaiveDate) -> ContactModel {
    ContactModel {
        name: name.to_string(),
        surname: surname.to_string(),
        email: email.to_string(),
        phone: "+1 555 0100".to_string(),
        birthday,
        notes: None,
    }
}

fn names(contacts: &[Contact]) -> Vec<&str> {
    contacts.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
async fn ownership_filters_every_operation() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let owner = fx.user("owner").await?;
    let other = fx.user("other").await?;

    let created = fx
        .contacts
        .create_contact(&model("Carol", "King", "carol@x.com", d(1980, 3, 3)), &owner)
        .await?;
    assert_eq!(created.user_id, owner.id);

    assert!(fx.contacts.get_contact_by_id(created.id, &other).await?.is_absent());
    let hijack = model("Mallory", "X", "m@x.com", d(1980, 1, 1));
    assert!(fx.contacts.update_contact(&hijack, created.id, &other).await?.is_absent());
    assert!(fx.contacts.remove_contact(created.id, &other).await?.is_absent());
    assert!(fx.contacts.get_contacts(10, 0, &other).await?.is_empty());
    assert!(fx.contacts.search_contacts("carol", &other).await?.is_empty());

    let still = fx.contacts.get_contact_by_id(created.id, &owner).await?.into_option();
    assert_eq!(still, Some(created));

    fx.cleanup().await
}

#[tokio::test]
async fn update_replaces_and_remove_returns_the_row() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let owner = fx.user("owner").await?;

    let mut original = model("Ann", "Lee", "ann@x.com", d(1990, 5, 17));
    original.notes = Some("old note".to_string());
    let created = fx.contacts.create_contact(&original, &owner).await?;

    let replacement = model("Annie", "Park", "annie@x.com", d(1990, 5, 18));
    let updated = fx
        .contacts
        .update_contact(&replacement, created.id, &owner)
        .await?
        .into_option()
        .ok_or_else(|| anyhow::anyhow!("update lost the row"))?;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Annie");
    assert_eq!(updated.notes, None);

    let removed = fx.contacts.remove_contact(created.id, &owner).await?.into_option();
    assert_eq!(removed, Some(updated));
    assert!(fx.contacts.remove_contact(created.id, &owner).await?.is_absent());
    assert!(fx.contacts.get_contact_by_id(created.id, &owner).await?.is_absent());

    fx.cleanup().await
}

#[tokio::test]
async fn pages_follow_id_order() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let owner = fx.user("pager").await?;

    for name in ["A1", "A2", "A3", "A4", "A5"] {
        let email = format!("{}@x.com", name.to_lowercase());
        fx.contacts
            .create_contact(&model(name, "Test", &email, d(1990, 1, 1)), &owner)
            .await?;
    }

    let all = fx.contacts.get_contacts(10, 0, &owner).await?;
    assert_eq!(names(&all), vec!["A1", "A2", "A3", "A4", "A5"]);

    let page = fx.contacts.get_contacts(2, 1, &owner).await?;
    assert_eq!(names(&page), vec!["A2", "A3"]);

    assert!(fx.contacts.get_contacts(0, 0, &owner).await?.is_empty());
    assert!(fx.contacts.get_contacts(2, 10, &owner).await?.is_empty());

    fx.cleanup().await
}

#[tokio::test]
async fn search_treats_like_wildcards_literally() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let owner = fx.user("searcher").await?;

    for data in [
        model("Ann", "Lee", "annie@x.com", d(1990, 1, 1)),
        model("Bob", "Under_Score", "bob@x.com", d(1990, 1, 1)),
        model("Pct", "Fifty%Off", "pct@x.com", d(1990, 1, 1)),
        model("Slash", "Back\\Slash", "slash@x.com", d(1990, 1, 1)),
    ] {
        fx.contacts.create_contact(&data, &owner).await?;
    }

    let found = fx.contacts.search_contacts("  ANN ", &owner).await?;
    assert_eq!(names(&found), vec!["Ann"]);

    let found = fx.contacts.search_contacts("%", &owner).await?;
    assert_eq!(names(&found), vec!["Pct"]);

    let found = fx.contacts.search_contacts("_", &owner).await?;
    assert_eq!(names(&found), vec!["Bob"]);

    let found = fx.contacts.search_contacts("\\", &owner).await?;
    assert_eq!(names(&found), vec!["Slash"]);

    assert!(fx.contacts.search_contacts("a_n", &owner).await?.is_empty());
    assert!(fx.contacts.search_contacts("   ", &owner).await?.is_empty());

    let found = fx.contacts.search_contacts("x.com", &owner).await?;
    assert_eq!(names(&found), vec!["Ann", "Bob", "Pct", "Slash"]);

    fx.cleanup().await
}

#[tokio::test]
async fn birthdays_wrap_into_the_new_year() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let owner = fx.user("birthdays").await?;
    let other = fx.user("bystander").await?;

    for (name, birthday) in [
        ("Past", d(1980, 12, 20)),
        ("Today", d(1985, 12, 28)),
        ("Soon", d(1990, 12, 30)),
        ("NewYear", d(1991, 1, 2)),
        ("Edge", d(1992, 1, 4)),
        ("TooFar", d(1993, 1, 5)),
    ] {
        let email = format!("{}@x.com", name.to_lowercase());
        fx.contacts
            .create_contact(&model(name, "B", &email, birthday), &owner)
            .await?;
    }
    fx.contacts
        .create_contact(&model("Elsewhere", "B", "e@x.com", d(1990, 12, 30)), &other)
        .await?;

    let upcoming = fx.contacts.get_contacts_birthdays(&owner).await?;
    assert_eq!(names(&upcoming), vec!["Today", "Soon", "NewYear", "Edge"]);

    fx.cleanup().await
}

#[tokio::test]
async fn duplicate_account_email_is_a_conflict() -> Result<()> {
    let Some(mut fx) = PgFixture::connect().await? else {
        return Ok(());
    };
    let user = fx.user("dupe").await?;

    let err = fx
        .users
        .create_user(NewUser {
            username: "again".to_string(),
            email: user.email.clone(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)), "{:?}", err);

    fx.users.update_token(&user, Some("digest".to_string())).await?;
    let stored = fx.users.get_user_by_email(&user.email).await?.into_option();
    assert_eq!(stored.and_then(|u| u.refresh_token), Some("digest".to_string()));

    fx.cleanup().await
}

use std::future::Future;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::cli::client::{ApiClient, ClientError};
use crate::cli::commands::access_client;
use crate::cli::config::CliConfig;
use crate::cli::utils::{output_contact, output_contacts, output_success};
use crate::cli::OutputFormat;
use crate::database::models::ContactModel;

#[derive(Subcommand)]
pub enum ContactCommands {
    #[command(about = "List contacts, oldest first")]
    List {
        #[arg(long, default_value_t = 10, help = "Page size (0-300)")]
        limit: i64,
        #[arg(long, default_value_t = 0, help = "Rows to skip")]
        offset: i64,
    },

    #[command(about = "Show one contact")]
    Get {
        #[arg(help = "Contact ID")]
        id: i32,
    },

    #[command(about = "Create a contact")]
    Create(ContactArgs),

    #[command(about = "Replace every field of a contact")]
    Update {
        #[arg(help = "Contact ID")]
        id: i32,
        #[command(flatten)]
        fields: ContactArgs,
    },

    #[command(about = "Delete a contact")]
    Delete {
        #[arg(help = "Contact ID")]
        id: i32,
    },

    #[command(about = "Find contacts by name, surname or email")]
    Search {
        #[arg(help = "Case-insensitive substring")]
        query: String,
    },

    #[command(about = "Contacts with a birthday in the next seven days")]
    Birthdays,
}

#[derive(Args)]
pub struct ContactArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub surname: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, help = "YYYY-MM-DD")]
    pub birthday: NaiveDate,
    #[arg(long)]
    pub notes: Option<String>,
}

impl From<ContactArgs> for ContactModel {
    fn from(args: ContactArgs) -> Self {
        ContactModel {
            name: args.name,
            surname: args.surname,
            email: args.email,
            phone: args.phone,
            birthday: args.birthday,
            notes: args.notes,
        }
    }
}

/// Run `call` with the access token; on a 401 refresh once and retry.
async fn with_session<T, F, Fut>(config: &mut CliConfig, call: F) -> anyhow::Result<T>
where
    F: Fn(ApiClient) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    match call(access_client(config)?).await {
        Err(e) if config.refresh_token.is_some() && is_unauthorized(&e) => {
            tracing::debug!("Access token rejected, refreshing");
            let refresher =
                ApiClient::new(&config.server_url)?.with_token(config.refresh_token.clone());
            let pair = match refresher.refresh().await {
                Ok(pair) => pair,
                Err(refresh_err) => {
                    config.clear_session();
                    config.save()?;
                    return Err(refresh_err);
                }
            };
            let email = config.email.clone().unwrap_or_default();
            config.set_session(&email, pair.access_token, pair.refresh_token);
            config.save()?;
            call(access_client(config)?).await
        }
        other => other,
    }
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ClientError>()
        .is_some_and(ClientError::is_unauthorized)
}

pub async fn handle(cmd: ContactCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;
    let config = &mut config;

    match cmd {
        ContactCommands::List { limit, offset } => {
            let contacts = with_session(config, |client| async move {
                client.list_contacts(limit, offset).await
            })
            .await?;
            output_contacts(&output_format, &contacts, "No contacts")
        }
        ContactCommands::Get { id } => {
            let contact =
                with_session(config, |client| async move { client.get_contact(id).await }).await?;
            output_contact(&output_format, &contact)
        }
        ContactCommands::Create(args) => {
            let model = ContactModel::from(args);
            let model = &model;
            let contact = with_session(config, |client| async move {
                client.create_contact(model).await
            })
            .await?;
            output_contact(&output_format, &contact)
        }
        ContactCommands::Update { id, fields } => {
            let model = ContactModel::from(fields);
            let model = &model;
            let contact = with_session(config, |client| async move {
                client.update_contact(id, model).await
            })
            .await?;
            output_contact(&output_format, &contact)
        }
        ContactCommands::Delete { id } => {
            with_session(config, |client| async move { client.delete_contact(id).await }).await?;
            output_success(
                &output_format,
                &format!("Deleted contact {}", id),
                Some(json!({ "id": id })),
            )
        }
        ContactCommands::Search { query } => {
            let query = query.as_str();
            let contacts = with_session(config, |client| async move {
                client.search_contacts(query).await
            })
            .await?;
            output_contacts(&output_format, &contacts, "No matching contacts")
        }
        ContactCommands::Birthdays => {
            let contacts = with_session(config, |client| async move {
                client.upcoming_birthdays().await
            })
            .await?;
            output_contacts(&output_format, &contacts, "No birthdays in the next week")
        }
    }
}

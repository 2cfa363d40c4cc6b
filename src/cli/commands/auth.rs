use clap::Subcommand;
use serde_json::json;

use crate::cli::client::{ApiClient, ClientError};
use crate::cli::config::CliConfig;
use crate::cli::utils::{output_success, output_value, resolve_password};
use crate::cli::OutputFormat;
use crate::database::models::UserModel;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account")]
    Signup {
        #[arg(help = "Display name")]
        username: String,
        #[arg(help = "Email, used to log in")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Login and store the session tokens")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Exchange the stored refresh token for a new pair")]
    Refresh,

    #[command(about = "Forget the stored session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;

    match cmd {
        AuthCommands::Signup { username, email, password } => {
            let password = resolve_password(password)?;
            let client = ApiClient::new(&config.server_url)?;
            let user = client.signup(&UserModel { username, email, password }).await?;
            output_value(&output_format, &user, |user| {
                println!("✓ Created account {} for {}", user.id, user.email);
            })
        }
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            let client = ApiClient::new(&config.server_url)?;
            let pair = client.login(&email, &password).await?;
            config.set_session(&email, pair.access_token, pair.refresh_token);
            config.save()?;
            output_success(
                &output_format,
                &format!("Logged in as {}", email),
                Some(json!({ "email": email, "server_url": config.server_url })),
            )
        }
        AuthCommands::Refresh => {
            let client =
                ApiClient::new(&config.server_url)?.with_token(config.refresh_token.clone());
            match client.refresh().await {
                Ok(pair) => {
                    let email = config.email.clone().unwrap_or_default();
                    config.set_session(&email, pair.access_token, pair.refresh_token);
                    config.save()?;
                    output_success(&output_format, "Tokens refreshed", None)
                }
                Err(e) => {
                    // The server revoked the session; drop our copy as well
                    if e.downcast_ref::<ClientError>()
                        .is_some_and(ClientError::is_unauthorized)
                    {
                        config.clear_session();
                        config.save()?;
                    }
                    Err(e)
                }
            }
        }
        AuthCommands::Logout => {
            config.clear_session();
            config.save()?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let status = json!({
                "server_url": config.server_url,
                "email": config.email,
                "logged_in": config.access_token.is_some(),
                "logged_in_at": config.logged_in_at,
            });
            output_value(&output_format, &status, |_| match (&config.email, config.logged_in_at) {
                (Some(email), Some(at)) => {
                    println!("Logged in as {} since {}", email, at.format("%Y-%m-%d %H:%M UTC"))
                }
                _ => println!("Not logged in"),
            })
        }
    }
}

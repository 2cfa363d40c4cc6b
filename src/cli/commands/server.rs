use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::CliConfig;
use crate::cli::utils::{output_success, output_value};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at a server (clears the current session)")]
    Set {
        #[arg(help = "Base URL, e.g. http://localhost:8000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Show,

    #[command(about = "Check that the server and its database respond")]
    Health,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;

    match cmd {
        ServerCommands::Set { url } => {
            let parsed = url::Url::parse(&url)
                .map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Server URL must use http or https");
            }
            config.server_url = url.trim_end_matches('/').to_string();
            config.clear_session();
            config.save()?;
            output_success(
                &output_format,
                &format!("Server set to {}", config.server_url),
                Some(json!({ "server_url": config.server_url })),
            )
        }
        ServerCommands::Show => {
            let details = json!({ "server_url": config.server_url });
            output_value(&output_format, &details, |_| println!("Server: {}", config.server_url))
        }
        ServerCommands::Health => {
            let body = ApiClient::new(&config.server_url)?.health().await?;
            output_value(&output_format, &body, |body| {
                let message = body.get("message").and_then(|m| m.as_str()).unwrap_or("ok");
                println!("✓ {} ({})", message, config.server_url);
            })
        }
    }
}

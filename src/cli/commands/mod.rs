pub mod auth;
pub mod contacts;
pub mod server;

use crate::cli::client::ApiClient;
use crate::cli::config::CliConfig;

/// Client carrying the stored access token.
pub(crate) fn access_client(config: &CliConfig) -> anyhow::Result<ApiClient> {
    Ok(ApiClient::new(&config.server_url)?.with_token(config.access_token.clone()))
}

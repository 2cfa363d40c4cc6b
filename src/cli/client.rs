use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::TokenPair;
use crate::database::models::{Contact, ContactModel, User, UserModel};

/// Error returned by the server, decoded from its error body
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{message} ({status}, {code})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Not logged in; run `contacts auth login <email>` first")]
    NotLoggedIn,

    #[error("Unexpected response from server: {0}")]
    Envelope(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Thin wrapper over reqwest that speaks the `{success, data}` envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("contacts-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        if self.token.is_none() {
            return Err(ClientError::NotLoggedIn.into());
        }
        Ok(self.request(method, path))
    }

    /// Send and unwrap the envelope; `None` for 204 responses.
    async fn send(&self, builder: RequestBuilder) -> anyhow::Result<Option<Value>> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Envelope(format!("{} ({})", e, status)))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            let code = body
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN")
                .to_string();
            return Err(ClientError::Api { status, code, message }.into());
        }

        match body.get("data") {
            Some(data) => Ok(Some(data.clone())),
            None => Err(ClientError::Envelope("missing data field".to_string()).into()),
        }
    }

    async fn send_as<T: DeserializeOwned>(&self, builder: RequestBuilder) -> anyhow::Result<T> {
        let data = self
            .send(builder)
            .await?
            .ok_or_else(|| ClientError::Envelope("empty body".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn health(&self) -> anyhow::Result<Value> {
        self.send_as(self.request(Method::GET, "/api/healthchecker"))
            .await
    }

    pub async fn signup(&self, body: &UserModel) -> anyhow::Result<User> {
        self.send_as(self.request(Method::POST, "/api/auth/signup").json(body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<TokenPair> {
        let form = [("username", email), ("password", password)];
        self.send_as(self.request(Method::POST, "/api/auth/login").form(&form))
            .await
    }

    /// Uses the client's token, which must be a refresh token here.
    pub async fn refresh(&self) -> anyhow::Result<TokenPair> {
        self.send_as(self.authed(Method::GET, "/api/auth/refresh_token")?)
            .await
    }

    pub async fn list_contacts(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Contact>> {
        let builder = self
            .authed(Method::GET, "/api/contacts/")?
            .query(&[("limit", limit), ("offset", offset)]);
        self.send_as(builder).await
    }

    pub async fn get_contact(&self, id: i32) -> anyhow::Result<Contact> {
        self.send_as(self.authed(Method::GET, &format!("/api/contacts/{}", id))?)
            .await
    }

    pub async fn create_contact(&self, body: &ContactModel) -> anyhow::Result<Contact> {
        self.send_as(self.authed(Method::POST, "/api/contacts/")?.json(body))
            .await
    }

    pub async fn update_contact(&self, id: i32, body: &ContactModel) -> anyhow::Result<Contact> {
        let builder = self
            .authed(Method::PUT, &format!("/api/contacts/{}", id))?
            .json(body);
        self.send_as(builder).await
    }

    pub async fn delete_contact(&self, id: i32) -> anyhow::Result<()> {
        self.send(self.authed(Method::DELETE, &format!("/api/contacts/{}", id))?)
            .await?;
        Ok(())
    }

    pub async fn search_contacts(&self, query: &str) -> anyhow::Result<Vec<Contact>> {
        let builder = self
            .authed(Method::GET, "/api/contacts/search/")?
            .query(&[("query", query)]);
        self.send_as(builder).await
    }

    pub async fn upcoming_birthdays(&self) -> anyhow::Result<Vec<Contact>> {
        self.send_as(self.authed(Method::GET, "/api/contacts/upcoming-birthdays/")?)
            .await
    }
}

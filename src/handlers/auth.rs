use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::{header, HeaderMap},
    Form, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{
    bearer_token, digest_token, hash_password, verify_password, TokenPair, TokenScope,
};
use crate::database::models::{NewUser, User, UserModel};
use crate::error::ApiError;
use crate::middleware::{resolve_user, ApiResponse, ApiResult};

/// OAuth2 password-flow form: `username` carries the email
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Run password hashing on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Password task failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })
}

/// Mint a token pair and remember the refresh token's digest on the account.
async fn issue_tokens(state: &AppState, user: &User) -> Result<TokenPair, ApiError> {
    let pair = state.tokens.issue_pair(&user.email)?;
    state
        .users
        .update_token(user, Some(digest_token(&pair.refresh_token)))
        .await?;
    Ok(pair)
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<UserModel>, JsonRejection>,
) -> ApiResult<User> {
    let Json(body) = body?;
    body.validate()
        .map_err(|field_errors| ApiError::unprocessable_entity("Validation failed", field_errors))?;

    let email = body.email.trim().to_lowercase();
    if !state.users.get_user_by_email(&email).await?.is_absent() {
        return Err(ApiError::conflict("Account already exists"));
    }

    let password = body.password;
    let password_hash = blocking(move || hash_password(&password)).await??;

    let user = state
        .users
        .create_user(NewUser {
            username: body.username.trim().to_string(),
            email,
            password_hash,
        })
        .await?;

    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok(ApiResponse::created(user))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<TokenPair> {
    let Form(form) = form?;
    let email = form.username.trim().to_lowercase();

    let user = state
        .users
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email"))?;

    let password = form.password;
    let stored = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &stored)).await? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let pair = issue_tokens(&state, &user).await?;
    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::success(pair))
}

/// GET /api/auth/refresh_token - bearer refresh token in, fresh pair out
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<TokenPair> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header).map_err(ApiError::unauthorized)?;

    let user = resolve_user(&state, token, TokenScope::RefreshToken).await?;

    let presented = digest_token(token);
    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        // A stale or replayed refresh token revokes the current one too
        tracing::warn!("Refresh token mismatch for user {}", user.id);
        state.users.update_token(&user, None).await?;
        return Err(ApiError::unauthorized("Invalid refresh token"));
    }

    let pair = issue_tokens(&state, &user).await?;
    Ok(ApiResponse::success(pair))
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{bearer_token, TokenScope};
use crate::database::models::User;
use crate::error::ApiError;

/// Authenticated user, resolved from the bearer token and re-read from storage
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

/// Validates the access token and injects `AuthUser` into the request.
/// Nothing behind this layer runs for an unauthenticated request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header).map_err(ApiError::unauthorized)?.to_string();

    let user = resolve_user(&state, &token, TokenScope::AccessToken).await?;
    tracing::debug!("Authenticated user {} ({})", user.id, user.email);

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Token → claims → stored user. A token for a deleted account is as good as none.
pub async fn resolve_user(
    state: &AppState,
    token: &str,
    scope: TokenScope,
) -> Result<User, ApiError> {
    let claims = state.tokens.decode(token, scope)?;

    state
        .users
        .get_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject '{}' has no account", claims.sub);
            ApiError::unauthorized("Could not validate credentials")
        })
}

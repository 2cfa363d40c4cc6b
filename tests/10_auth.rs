mod common;

use std::time::Duration;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use contacts_api::auth::digest_token;

use common::TestApp;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new();

    let res = app.request(Method::GET, "/api/healthchecker", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["message"], "Welcome to Contacts API!");
    Ok(())
}

#[tokio::test]
async fn signup_hides_secrets_and_rejects_duplicates() -> Result<()> {
    let app = TestApp::new();

    let res = app.signup("ann", "Ann@Example.com", "secret123").await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.data()["email"], "ann@example.com");
    assert!(res.data().get("password_hash").is_none());
    assert!(res.data().get("refresh_token").is_none());

    let res = app.signup("ann again", "ann@example.com", "secret456").await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn signup_validates_fields() -> Result<()> {
    let app = TestApp::new();

    let res = app.signup("an", "not-an-email", "123").await?;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = &res.body["field_errors"];
    assert!(fields.get("username").is_some(), "{}", res.body);
    assert!(fields.get("email").is_some(), "{}", res.body);
    assert!(fields.get("password").is_some(), "{}", res.body);
    Ok(())
}

#[tokio::test]
async fn login_issues_bearer_pair() -> Result<()> {
    let app = TestApp::new();
    app.signup("ann", "ann@example.com", "secret123").await?;

    let res = app.login("ann@example.com", "secret123").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["token_type"], "bearer");
    assert!(res.data()["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(res.data()["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password() -> Result<()> {
    let app = TestApp::new();
    app.signup("ann", "ann@example.com", "secret123").await?;

    let res = app.login("bob@example.com", "secret123").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid email");

    let res = app.login("ann@example.com", "wrong-password").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid password");
    let challenge = res.headers.get(header::WWW_AUTHENTICATE).map(|v| v.as_bytes());
    assert_eq!(challenge, Some(&b"Bearer"[..]));
    Ok(())
}

#[tokio::test]
async fn contacts_require_an_access_token() -> Result<()> {
    let app = TestApp::new();
    let (_, refresh) = app.register("ann@example.com").await?;

    let res = app.request(Method::GET, "/api/contacts/", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/contacts/", "not-a-jwt").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token
    let res = app.get("/api/contacts/", &refresh).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid scope for token");
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_tokens() -> Result<()> {
    let app = TestApp::new();
    let (access, refresh) = app.register("ann@example.com").await?;

    // An access token cannot be used to refresh
    let res = app.get("/api/auth/refresh_token", &access).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/auth/refresh_token", &refresh).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    let new_access = res.data()["access_token"].as_str().unwrap_or_default().to_string();

    let res = app.get("/api/contacts/", &new_access).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn stale_refresh_token_revokes_the_session() -> Result<()> {
    let app = TestApp::new();
    let (_, stale) = app.register("ann@example.com").await?;

    // Tokens carry second-resolution iat; a later login mints a different pair
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let res = app.login("ann@example.com", "secret123").await?;
    assert_eq!(res.status, StatusCode::OK);
    let current = res.data()["refresh_token"].as_str().unwrap_or_default().to_string();
    assert_ne!(stale, current);

    let res = app.get("/api/auth/refresh_token", &stale).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid refresh token");

    let stored = app.state.users.get_user_by_email("ann@example.com").await?;
    assert_eq!(stored.into_option().and_then(|u| u.refresh_token), None);

    // The newest token went with it
    let res = app.get("/api/auth/refresh_token", &current).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid refresh token");
    Ok(())
}

#[tokio::test]
async fn refresh_token_must_match_stored_digest() -> Result<()> {
    let app = TestApp::new();
    let (_, refresh) = app.register("ann@example.com").await?;

    let user = app
        .state
        .users
        .get_user_by_email("ann@example.com")
        .await?
        .ok_or_else(|| anyhow::anyhow!("user missing"))?;
    app.state
        .users
        .update_token(&user, Some(digest_token("issued-elsewhere")))
        .await?;

    let res = app.get("/api/auth/refresh_token", &refresh).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid refresh token");

    let stored = app.state.users.get_user_by_email("ann@example.com").await?;
    assert_eq!(stored.into_option().and_then(|u| u.refresh_token), None);
    Ok(())
}

#[tokio::test]
async fn unknown_public_path_is_not_found() -> Result<()> {
    let app = TestApp::new();

    let res = app.request(Method::GET, "/api/nothing-here", None, None).await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

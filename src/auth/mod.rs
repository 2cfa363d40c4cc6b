use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    AccessToken,
    RefreshToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account email
    pub sub: String,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Could not validate credentials")]
    InvalidToken(String),

    #[error("Invalid scope for token")]
    InvalidScope,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

/// Issues and checks the signed tokens that identify a user.
#[derive(Debug, Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn create_access_token(&self, email: &str) -> Result<String, AuthError> {
        self.create_token(email, TokenScope::AccessToken, self.access_ttl)
    }

    pub fn create_refresh_token(&self, email: &str) -> Result<String, AuthError> {
        self.create_token(email, TokenScope::RefreshToken, self.refresh_ttl)
    }

    pub fn issue_pair(&self, email: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.create_access_token(email)?,
            refresh_token: self.create_refresh_token(email)?,
            token_type: "bearer".to_string(),
        })
    }

    fn create_token(
        &self,
        email: &str,
        scope: TokenScope,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            scope,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify signature and expiry, then insist on the expected scope.
    pub fn decode(&self, token: &str, expected: TokenScope) -> Result<Claims, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if token_data.claims.scope != expected {
            return Err(AuthError::InvalidScope);
        }
        Ok(token_data.claims)
    }
}

/// Argon2id hash in PHC string format
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// False for a wrong password and for a hash that does not parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Refresh tokens are stored as a SHA-256 hex digest, never in the clear.
pub fn digest_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, String> {
    let auth_str = header.ok_or_else(|| "Not authenticated".to_string())?;

    match auth_str.strip_prefix("Bearer ").or_else(|| auth_str.strip_prefix("bearer ")) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn service() -> TokenService {
        TokenService::new(&AppConfig::for_tests().security)
    }

    #[test]
    fn access_token_round_trip() {
        let tokens = service();
        let token = tokens.create_access_token("ann@x.com").unwrap();
        let claims = tokens.decode(&token, TokenScope::AccessToken).unwrap();
        assert_eq!(claims.sub, "ann@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn scope_is_enforced() {
        let tokens = service();
        let refresh = tokens.create_refresh_token("ann@x.com").unwrap();
        assert!(matches!(
            tokens.decode(&refresh, TokenScope::AccessToken),
            Err(AuthError::InvalidScope)
        ));
    }

    #[test]
    fn foreign_signature_rejected() {
        let mut other_config = AppConfig::for_tests().security;
        other_config.jwt_secret = "someone-else".to_string();
        let forged = TokenService::new(&other_config).create_access_token("ann@x.com").unwrap();
        assert!(matches!(
            service().decode(&forged, TokenScope::AccessToken),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let mut config = AppConfig::for_tests().security;
        config.access_token_minutes = -10;
        let tokens = TokenService::new(&config);
        let token = tokens.create_access_token("ann@x.com").unwrap();
        assert!(matches!(
            tokens.decode(&token, TokenScope::AccessToken),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut config = AppConfig::for_tests().security;
        config.jwt_secret.clear();
        assert!(matches!(
            TokenService::new(&config).create_access_token("ann@x.com"),
            Err(AuthError::InvalidSecret)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn digest_is_stable_hex() {
        let a = digest_token("abc");
        assert_eq!(a, digest_token("abc"));
        assert_eq!(a.len(), 64);
        assert_eq!(a, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Bearer   ")).is_err());
        assert!(bearer_token(Some("Basic abc")).is_err());
    }
}

use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service banner
pub async fn root() -> ApiResponse<Value> {
    let version = env!("CARGO_PKG_VERSION");

    ApiResponse::success(json!({
        "name": "Contacts API",
        "version": version,
        "endpoints": {
            "health": "/api/healthchecker (public)",
            "auth": "/api/auth/signup, /api/auth/login, /api/auth/refresh_token (public)",
            "contacts": "/api/contacts/[:contact_id] (protected)",
            "search": "/api/contacts/search/?query= (protected)",
            "birthdays": "/api/contacts/upcoming-birthdays/ (protected)",
        }
    }))
}

/// GET /api/healthchecker - round-trips the database when there is one
pub async fn healthchecker(State(state): State<AppState>) -> ApiResult<Value> {
    if let Some(pool) = &state.pool {
        DatabaseManager::health_check(pool).await.map_err(|e| {
            tracing::error!("Health check failed: {}", e);
            ApiError::internal_server_error("Error connecting to the database")
        })?;
    }

    Ok(ApiResponse::success(json!({ "message": "Welcome to Contacts API!" })))
}

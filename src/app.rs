use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseError, DatabaseManager};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::repository::{
    ContactRepository, MemoryContactRepository, MemoryUserRepository, PgContactRepository,
    PgUserRepository, UserRepository,
};
use crate::services::{Clock, SystemClock};

/// Shared, cheaply clonable application context handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub contacts: Arc<dyn ContactRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<TokenService>,
    pub clock: Arc<dyn Clock>,
    /// Present for the postgres backend; used by the health check
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Wire repositories for the configured backend.
    pub async fn from_config(config: AppConfig) -> Result<Self, DatabaseError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        match config.database.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config, clock))
            }
            StorageBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                DatabaseManager::ensure_schema(&pool).await?;
                Ok(Self::postgres(config, clock, pool))
            }
        }
    }

    pub fn postgres(config: AppConfig, clock: Arc<dyn Clock>, pool: PgPool) -> Self {
        let window = config.api.birthday_window_days;
        Self {
            tokens: Arc::new(TokenService::new(&config.security)),
            contacts: Arc::new(PgContactRepository::new(pool.clone(), clock.clone(), window)),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            clock,
            pool: Some(pool),
            config: Arc::new(config),
        }
    }

    pub fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let window = config.api.birthday_window_days;
        Self {
            tokens: Arc::new(TokenService::new(&config.security)),
            contacts: Arc::new(MemoryContactRepository::new(clock.clone(), window)),
            users: Arc::new(MemoryUserRepository::new()),
            clock,
            pool: None,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    let router = Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/api/healthchecker", get(handlers::health::healthchecker))
        .merge(auth_routes())
        // Protected
        .merge(contact_routes(state.clone()))
        // Global middleware
        .layer(cors);

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::auth;

    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh_token", get(auth::refresh_token))
}

fn contact_routes(state: AppState) -> Router<AppState> {
    use handlers::contacts;

    Router::new()
        // Collection, with and without the trailing slash
        .route(
            "/api/contacts/",
            get(contacts::get_contacts).post(contacts::create_contact),
        )
        .route(
            "/api/contacts",
            get(contacts::get_contacts).post(contacts::create_contact),
        )
        .route("/api/contacts/search/", get(contacts::search_contacts))
        .route("/api/contacts/search", get(contacts::search_contacts))
        .route("/api/contacts/upcoming-birthdays/", get(contacts::get_contacts_birthdays))
        .route("/api/contacts/upcoming-birthdays", get(contacts::get_contacts_birthdays))
        // Single contact
        .route(
            "/api/contacts/:contact_id",
            get(contacts::get_contact_by_id)
                .put(contacts::update_contact)
                .delete(contacts::remove_contact),
        )
        // route_layer: unmatched paths stay 404 instead of 401
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

// handlers/mod.rs - route handlers by area
//
// Public: health, auth (signup/login/refresh)
// Protected (jwt_auth_middleware): contacts
pub mod auth;
pub mod contacts;
pub mod health;

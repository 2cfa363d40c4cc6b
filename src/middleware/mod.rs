pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, resolve_user, AuthUser};
pub use response::{ApiResponse, ApiResult};

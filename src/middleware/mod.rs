pub mod auth;
pub mod response;

pub use auth::{auth_middleware, AuthUser};
pub use response::{ApiJson, ApiResponse, ApiResult};

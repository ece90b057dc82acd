pub mod auth;
pub mod request_id;
pub mod timing;

pub use auth::{AuthenticatedUser, USER_EMAIL_HEADER, USER_PASSWORD_HEADER};
pub use request_id::request_id_middleware;
pub use timing::{timing_middleware, RequestMetrics};

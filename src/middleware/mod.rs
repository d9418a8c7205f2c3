pub mod auth;
pub mod guard;

pub use auth::{require_auth, CurrentUser};
pub use guard::{guard_middleware, AuthGuard};

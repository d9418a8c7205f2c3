// handlers/protected/auth/mod.rs - Session and token management for the current user

pub mod logout;   // POST /api/auth/logout, /api/auth/logout-other-devices
pub mod password; // PUT /api/auth/password
pub mod tokens;   // GET /api/auth/tokens
pub mod user;     // GET /api/auth/user

pub use logout::{logout_other_devices_post, logout_post};
pub use password::password_put;
pub use tokens::tokens_get;
pub use user::user_get;

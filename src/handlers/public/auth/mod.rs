// handlers/public/auth/mod.rs - Token acquisition

pub mod login; // POST /auth/login - verify credentials and issue a database token

pub use login::login_post;

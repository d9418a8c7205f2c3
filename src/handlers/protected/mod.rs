// handlers/protected/mod.rs - Endpoints behind require_auth

pub mod auth;

// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (database token required)

pub mod health;
pub mod protected;
pub mod public;
pub mod utils;

pub use health::health;

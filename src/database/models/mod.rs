pub mod token;
pub mod user;

pub use token::{DatabaseToken, NewToken};
pub use user::User;

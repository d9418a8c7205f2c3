pub mod rules;
pub mod translator;
pub mod validator;

pub use rules::{Rule, Rules};
pub use translator::{Catalog, TranslationError, Translator};
pub use validator::{ValidationErrors, Validator};

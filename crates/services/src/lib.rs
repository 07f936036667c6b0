pub mod auth;
pub mod translation;

pub use auth::{SessionAuthManager, SessionKey};
pub use translation::TranslationServiceImpl;

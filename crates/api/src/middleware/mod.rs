// API Middleware
//
// This module contains custom middleware for the API layer:
// the browser session cookie and the signed-in user requirement.

pub mod auth;
pub mod session;

// Re-export commonly used items
pub use auth::{require_identity, AuthenticatedUser};
pub use session::{session_middleware, SESSION_COOKIE};

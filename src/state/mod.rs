//! State module for tracking login progress
//!
//! # Components
//!
//! - `AuthState`: the login state machine (unauthenticated, pending, authenticated, failed)
//! - `Session`: the validated cookie jar and signing context handed to the API client

mod auth_state;
mod session;

// Re-export main types
pub use auth_state::AuthState;
pub use session::{CookieJar, Session, SigningContext, SESSION_MARKER_COOKIE};

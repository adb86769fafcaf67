/// Authentication state definitions for the login state machine
///
/// This module defines every state a login attempt can be in and which
/// transitions between them are legal.
use crate::auth::LoginMode;
use crate::CrawlerError;
use std::fmt;

/// Represents the current state of the login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthState {
    /// No session exists yet, or the previous one was invalidated
    #[default]
    Unauthenticated,

    /// A login was started in the given mode and awaits confirmation
    Pending(LoginMode),

    /// The platform confirmed the session
    Authenticated,

    /// The confirmation budget ran out; terminal
    LoginFailed,
}

impl AuthState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LoginFailed)
    }

    /// Returns true if a login is in progress
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns true if the session may be used for requests
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// | From | To |
    /// |------|----|
    /// | Unauthenticated | Pending(mode) |
    /// | Pending(mode) | Authenticated, LoginFailed |
    /// | Authenticated | Unauthenticated (invalidation) |
    /// | LoginFailed | nothing |
    pub fn can_transition_to(&self, next: AuthState) -> bool {
        matches!(
            (self, next),
            (Self::Unauthenticated, Self::Pending(_))
                | (Self::Pending(_), Self::Authenticated)
                | (Self::Pending(_), Self::LoginFailed)
                | (Self::Authenticated, Self::Unauthenticated)
        )
    }

    /// Performs a transition, rejecting illegal ones
    pub fn transition(&mut self, next: AuthState) -> Result<(), CrawlerError> {
        if !self.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!("Auth state {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    /// Short label used in logs and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Pending(LoginMode::QrCode) => "pending_qrcode",
            Self::Pending(LoginMode::Phone) => "pending_phone",
            Self::Pending(LoginMode::Cookie) => "pending_cookie",
            Self::Authenticated => "authenticated",
            Self::LoginFailed => "login_failed",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

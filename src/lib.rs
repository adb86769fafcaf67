//! Media-Crawler: a keyword crawler for the Xiaohongshu note platform
//!
//! This crate logs a browser session in, searches notes by keyword, fetches
//! note detail and full comment trees (sub-comments included), optionally
//! posts replies, and forwards every record to a write sink.

pub mod auth;
pub mod browser;
pub mod client;
pub mod config;
pub mod crawler;
pub mod models;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("IP blocked by platform: {message}")]
    IpBlocked { message: String },

    #[error("Data fetch failed for {path}: {message}")]
    DataFetch {
        path: String,
        code: Option<i64>,
        message: String,
    },

    #[error("Session expired: {message}")]
    AuthExpired { message: String },

    #[error("Login failed ({mode}): {reason}")]
    LoginFailed { mode: String, reason: String },

    #[error("Signing failed for {path}: {message}")]
    Signing { path: String, message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Code channel error: {0}")]
    CodeChannel(String),

    #[error("HTTP error for {path}: {source}")]
    Http {
        path: String,
        source: reqwest::Error,
    },

    #[error("Unexpected payload for {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How far an error reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Only the current item is lost; siblings continue
    Recoverable,
    /// The session is unusable and must be rebuilt through a full login
    SessionFatal,
    /// The whole run must stop
    RunFatal,
}

impl CrawlerError {
    /// Classifies this error for containment decisions
    pub fn severity(&self) -> Severity {
        match self {
            Self::DataFetch { .. } | Self::Http { .. } | Self::Decode { .. } => {
                Severity::Recoverable
            }
            Self::AuthExpired { .. } | Self::Signing { .. } => Severity::SessionFatal,
            Self::IpBlocked { .. }
            | Self::LoginFailed { .. }
            | Self::Browser(_)
            | Self::CodeChannel(_)
            | Self::Config(_)
            | Self::Storage(_)
            | Self::InvalidTransition { .. }
            | Self::Cancelled
            | Self::Io(_) => Severity::RunFatal,
        }
    }

    /// Returns true if the error only affects a single item
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use auth::{AuthSessionManager, LoginMode, PollOutcome};
pub use client::{ApiClient, SigningOracle, XhsClient};
pub use config::Config;
pub use crawler::{CrawlReport, CrawlScheduler, PlatformSpider, Spider};
pub use state::{AuthState, Session};

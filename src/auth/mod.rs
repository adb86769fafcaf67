//! Login and session management
//!
//! The [`AuthSessionManager`] drives the browser through one of three login
//! modes, waits for the platform to confirm the session, and hands out an
//! immutable [`Session`](crate::state::Session) snapshot. Its collaborators
//! are injected as traits:
//! - [`CodeChannel`] delivers SMS codes (Redis in production)
//! - [`QrDisplay`] shows the login QR code to the operator

mod manager;
mod qrcode;
mod sms;

pub use manager::{
    AuthSessionManager, LoginSettings, PollOutcome, AGREEMENT_SELECTOR, CODE_INPUT_SELECTOR,
    COOKIE_DOMAIN, PHONE_INPUT_SELECTOR, QR_IMAGE_SELECTOR, SEND_CODE_SELECTOR, SUBMIT_SELECTOR,
};
pub use qrcode::{decode_data_url, FileQrDisplay};
pub use sms::RedisCodeChannel;

use crate::CrawlerError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// How the crawler logs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
pub enum LoginMode {
    /// Scan a QR code with the mobile app
    #[default]
    #[serde(rename = "qrcode")]
    #[value(name = "qrcode")]
    QrCode,
    /// Phone number plus SMS code read from the code channel
    #[serde(rename = "phone")]
    #[value(name = "phone")]
    Phone,
    /// Inject a known `web_session` cookie
    #[serde(rename = "cookie")]
    #[value(name = "cookie")]
    Cookie,
}

impl LoginMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QrCode => "qrcode",
            Self::Phone => "phone",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key-value store the SMS code is delivered through
#[async_trait]
pub trait CodeChannel: Send + Sync {
    /// Returns the value stored under `key`, or `None` when nothing arrived yet
    async fn get(&self, key: &str) -> Result<Option<String>, CrawlerError>;
}

/// Presents the login QR code to whoever has to scan it
#[async_trait]
pub trait QrDisplay: Send + Sync {
    /// `image_src` is the `src` attribute of the QR image, usually a base64 data URL
    async fn show(&self, image_src: &str) -> Result<(), CrawlerError>;
}

use crate::auth::QrDisplay;
use crate::CrawlerError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::path::PathBuf;
use tracing::info;

/// Decodes the payload of a base64 data URL (`data:image/png;base64,...`)
///
/// A bare base64 string without the `data:` prefix is accepted too.
pub fn decode_data_url(src: &str) -> Result<Vec<u8>, CrawlerError> {
    let payload = match src.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => src,
    };
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| CrawlerError::LoginFailed {
            mode: "qrcode".to_string(),
            reason: format!("QR image is not valid base64: {}", e),
        })
}

/// Writes the QR code to a PNG file for the operator to open and scan
pub struct FileQrDisplay {
    path: PathBuf,
}

impl FileQrDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QrDisplay for FileQrDisplay {
    async fn show(&self, image_src: &str) -> Result<(), CrawlerError> {
        if image_src.starts_with("http://") || image_src.starts_with("https://") {
            info!("Scan the login QR code at {}", image_src);
            return Ok(());
        }
        let bytes = decode_data_url(image_src)?;
        tokio::fs::write(&self.path, &bytes).await?;
        info!("Scan the login QR code saved to {}", self.path.display());
        Ok(())
    }
}

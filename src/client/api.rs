//! Signed HTTP client for the platform API
//!
//! This module handles every request the crawler sends, including:
//! - Building the HTTP client (timeouts, proxy, compression)
//! - Serializing POST bodies exactly once so the signed bytes are the sent bytes
//! - Attaching session cookies and per-request signature headers
//! - Classifying the platform's response envelope

use crate::client::signing::SigningOracle;
use crate::config::PlatformConfig;
use crate::state::Session;
use crate::CrawlerError;
use reqwest::header::{CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Error code the platform uses when the calling network identity is restricted
pub const IP_BLOCKED_CODE: i64 = 300012;

/// Error code the platform uses when the login session is no longer valid
pub const AUTH_EXPIRED_CODE: i64 = -100;

/// Error code for notes that exist but cannot be shown
pub const NOTE_ABNORMAL_CODE: i64 = -510001;

/// Envelope wrapped around every platform response
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Builds an HTTP client with the platform timeouts and optional proxy
pub fn build_http_client(config: &PlatformConfig) -> Result<Client, CrawlerError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| CrawlerError::Http {
            path: proxy.clone(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| CrawlerError::Http {
        path: config.api_host.clone(),
        source: e,
    })
}

/// Serializes a POST body deterministically
///
/// Keys keep their declaration order, output is compact and non-ASCII text
/// is not escaped. The returned string is both signed and sent.
pub fn serialize_body<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<String, CrawlerError> {
    serde_json::to_string(body).map_err(|e| CrawlerError::Decode {
        path: path.to_string(),
        message: format!("body serialization failed: {}", e),
    })
}

/// Appends query parameters to a path in the given order
///
/// The result is what gets signed, so it must match the request URL byte for byte.
pub fn build_query_path(path: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("{}?{}", path, query)
}

/// Classifies a decoded response envelope
///
/// | Condition | Result |
/// |-----------|--------|
/// | `success == true` | `data`, or `true` when absent |
/// | code 300012 | `IpBlocked` |
/// | code -100 | `AuthExpired` |
/// | anything else | `DataFetch` with the platform message |
pub fn classify_response(path: &str, envelope: ApiEnvelope) -> Result<Value, CrawlerError> {
    if envelope.success {
        return Ok(envelope.data.unwrap_or(Value::Bool(true)));
    }

    let message = envelope.msg.unwrap_or_default();
    match envelope.code {
        Some(IP_BLOCKED_CODE) => Err(CrawlerError::IpBlocked { message }),
        Some(AUTH_EXPIRED_CODE) => Err(CrawlerError::AuthExpired { message }),
        code => Err(CrawlerError::DataFetch {
            path: path.to_string(),
            code,
            message,
        }),
    }
}

/// Platform API client bound to one session
///
/// The session is an immutable snapshot; a rebuilt login produces a new client.
pub struct ApiClient {
    http: Client,
    host: String,
    origin: String,
    user_agent: String,
    session: Arc<Session>,
    oracle: Arc<dyn SigningOracle>,
}

impl ApiClient {
    pub fn new(
        config: &PlatformConfig,
        user_agent: &str,
        session: Arc<Session>,
        oracle: Arc<dyn SigningOracle>,
    ) -> Result<Self, CrawlerError> {
        Ok(Self {
            http: build_http_client(config)?,
            host: config.api_host.trim_end_matches('/').to_string(),
            origin: config.index_url.clone(),
            user_agent: user_agent.to_string(),
            session,
            oracle,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Sends a signed GET with query parameters in the given order
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, CrawlerError> {
        let signed_path = build_query_path(path, params);
        self.request(Method::GET, &signed_path, None).await
    }

    /// Sends a signed POST with a JSON body
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, CrawlerError> {
        let payload = serialize_body(path, body)?;
        self.request(Method::POST, path, Some(payload)).await
    }

    async fn request(
        &self,
        method: Method,
        signed_path: &str,
        body: Option<String>,
    ) -> Result<Value, CrawlerError> {
        let signature = self
            .oracle
            .sign(signed_path, body.as_deref(), self.session.signing())
            .await?;

        let url = format!("{}{}", self.host, signed_path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(COOKIE, self.session.cookie_header())
            .header(ORIGIN, self.origin.as_str())
            .header(REFERER, self.origin.as_str())
            .header(CONTENT_TYPE, "application/json;charset=UTF-8");
        for (name, value) in signature.pairs() {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| CrawlerError::Http {
            path: signed_path.to_string(),
            source: e,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| CrawlerError::Http {
            path: signed_path.to_string(),
            source: e,
        })?;

        let envelope: ApiEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CrawlerError::DataFetch {
                    path: signed_path.to_string(),
                    code: Some(i64::from(status.as_u16())),
                    message: format!("HTTP {}", status.as_u16()),
                })
            }
            Err(e) => {
                return Err(CrawlerError::Decode {
                    path: signed_path.to_string(),
                    message: e.to_string(),
                })
            }
        };

        classify_response(signed_path, envelope)
    }
}

//! Request signing contract
//!
//! Every call to the platform must carry headers derived from the exact
//! request path and body. Producing them is delegated to a [`SigningOracle`];
//! the browser-backed oracle asks the platform's own page script to compute
//! the signature.

use crate::browser::BrowserSurface;
use crate::client::field::new_trace_id;
use crate::state::SigningContext;
use crate::CrawlerError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Signature headers for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub x_s: String,
    pub x_t: String,
    pub x_s_common: String,
    pub trace_id: String,
}

impl SignedHeaders {
    /// Header name/value pairs in the form sent on the wire
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("X-S", self.x_s.as_str()),
            ("X-T", self.x_t.as_str()),
            ("x-S-Common", self.x_s_common.as_str()),
            ("X-B3-Traceid", self.trace_id.as_str()),
        ]
    }
}

/// Computes signature headers for a request
///
/// `path` includes the query string for GET requests and `body` is the exact
/// serialized payload that will be sent. Headers are only valid for the
/// request they were computed for.
///
/// An `Err` means the signing surface itself is unusable; callers treat it
/// as fatal to the session.
#[async_trait]
pub trait SigningOracle: Send + Sync {
    async fn sign(
        &self,
        path: &str,
        body: Option<&str>,
        context: &SigningContext,
    ) -> Result<SignedHeaders, CrawlerError>;
}

/// Identifier block carried in the `x-S-Common` header
#[derive(Debug, Serialize)]
struct CommonBlock<'a> {
    s0: u8,
    s1: &'a str,
    x0: &'a str,
    x1: &'a str,
    x2: &'a str,
    x3: &'a str,
    x4: &'a str,
    x5: &'a str,
    x6: &'a str,
    x7: &'a str,
    x8: &'a str,
    x10: u8,
}

/// Packs the browser identifiers and the page signature into `x-S-Common`
pub fn encode_common_header(context: &SigningContext, x_s: &str, x_t: &str) -> String {
    let block = CommonBlock {
        s0: 5,
        s1: "",
        x0: "1",
        x1: "3.3.0",
        x2: "Windows",
        x3: "xhs-pc-web",
        x4: "1.4.4",
        x5: &context.a1,
        x6: x_t,
        x7: x_s,
        x8: &context.b1,
        x10: 24,
    };
    // Serializing a struct of plain strings cannot fail
    let json = serde_json::to_string(&block).unwrap_or_default();
    general_purpose::STANDARD.encode(json.as_bytes())
}

/// Oracle that evaluates the platform's signing function inside the logged-in page
pub struct BrowserSigningOracle {
    surface: Arc<dyn BrowserSurface>,
}

impl BrowserSigningOracle {
    pub fn new(surface: Arc<dyn BrowserSurface>) -> Self {
        Self { surface }
    }

    /// Builds the page expression; the body is embedded verbatim as a JS literal
    /// so the page signs the same key order that goes on the wire
    fn signing_expression(path: &str, body: Option<&str>) -> String {
        let path_literal = serde_json::to_string(path).unwrap_or_else(|_| "\"\"".to_string());
        format!(
            "window._webmsxyw({}, {})",
            path_literal,
            body.unwrap_or("undefined")
        )
    }
}

#[async_trait]
impl SigningOracle for BrowserSigningOracle {
    async fn sign(
        &self,
        path: &str,
        body: Option<&str>,
        context: &SigningContext,
    ) -> Result<SignedHeaders, CrawlerError> {
        let expression = Self::signing_expression(path, body);
        let result = self
            .surface
            .evaluate(&expression)
            .await
            .map_err(|e| CrawlerError::Signing {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let x_s = match result.get("X-s") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(CrawlerError::Signing {
                    path: path.to_string(),
                    message: format!("page returned no X-s: {}", result),
                })
            }
        };
        let x_t = match result.get("X-t") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(CrawlerError::Signing {
                    path: path.to_string(),
                    message: format!("page returned no X-t: {}", result),
                })
            }
        };

        Ok(SignedHeaders {
            x_s_common: encode_common_header(context, &x_s, &x_t),
            x_s,
            x_t,
            trace_id: new_trace_id(),
        })
    }
}

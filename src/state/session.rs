use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Name of the cookie whose value changes when a login succeeds
pub const SESSION_MARKER_COOKIE: &str = "web_session";

/// Cookie set keyed by name
///
/// Order is irrelevant to the platform; a sorted map keeps the serialized
/// header stable between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a jar from (name, value) pairs; later duplicates win
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Value of the login marker cookie, if present
    pub fn session_marker(&self) -> Option<&str> {
        self.get(SESSION_MARKER_COOKIE)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes the jar as a `Cookie` header value (`a=1;b=2`)
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Platform-issued browser identifiers the signing material is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningContext {
    /// Device id cookie
    pub a1: String,
    /// Browser fingerprint kept in local storage
    pub b1: String,
    /// Web id cookie
    pub web_id: Option<String>,
}

impl SigningContext {
    /// Extracts the identifiers from the cookie jar and the local-storage `b1` value
    pub fn from_cookies(cookies: &CookieJar, b1: Option<String>) -> Self {
        Self {
            a1: cookies.get("a1").unwrap_or_default().to_string(),
            b1: b1.unwrap_or_default(),
            web_id: cookies.get("webId").map(str::to_string),
        }
    }
}

/// A validated login session
///
/// Built by the auth manager once the platform confirmed the login and then
/// shared read-only with the API client.
#[derive(Debug, Clone)]
pub struct Session {
    cookies: CookieJar,
    signing: SigningContext,
    established_at: DateTime<Utc>,
}

impl Session {
    /// Snapshots a confirmed login
    pub fn new(cookies: CookieJar, signing: SigningContext) -> Self {
        Self {
            cookies,
            signing,
            established_at: Utc::now(),
        }
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn signing(&self) -> &SigningContext {
        &self.signing
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    pub fn cookie_header(&self) -> String {
        self.cookies.header_value()
    }
}

//! Search filter enums and request identifiers

use rand::Rng;
use serde::Deserialize;

/// Ordering of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SearchSortType {
    /// Platform default ranking
    #[default]
    General,
    /// Most liked first
    PopularityDescending,
    /// Newest first
    TimeDescending,
}

impl SearchSortType {
    pub fn as_api_value(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::PopularityDescending => "popularity_descending",
            Self::TimeDescending => "time_descending",
        }
    }
}

/// Kind of note returned by search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SearchNoteType {
    #[default]
    All,
    Video,
    Image,
}

impl SearchNoteType {
    pub fn as_api_value(&self) -> u8 {
        match self {
            Self::All => 0,
            Self::Video => 1,
            Self::Image => 2,
        }
    }
}

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.5112.79 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/103.0.5060.53 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.4844.84 Safari/537.36",
];

/// Picks one of a handful of desktop Chrome user agents
pub fn random_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS[rand::thread_rng().gen_range(0..DESKTOP_USER_AGENTS.len())]
}

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encodes a number in lowercase base 36
pub fn base36_encode(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Generates a fresh `search_id`: millisecond timestamp in the high 64 bits
/// plus a random low part, base-36 encoded
pub fn new_search_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    let salt: u128 = rand::thread_rng().gen_range(0..2_147_483_646);
    base36_encode((millis << 64) + salt)
}

/// Generates a 16 character lowercase hex trace id
pub fn new_trace_id() -> String {
    const HEX: &[u8] = b"abcdef0123456789";
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

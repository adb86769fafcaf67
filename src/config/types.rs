use crate::auth::LoginMode;
use crate::client::{SearchNoteType, SearchSortType};
use serde::Deserialize;

/// Main configuration structure for Media-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub reply: Option<ReplyConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Keywords to search, comma separated on the command line
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of notes collected per keyword
    #[serde(default = "default_max_notes")]
    pub max_notes: u32,

    /// Search page size
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page size used when walking a sub-comment cursor chain
    #[serde(default = "default_sub_comment_page_size")]
    pub sub_comment_page_size: u32,

    /// Upper bound on in-flight tasks within a phase
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: u32,

    /// Fixed delay between paginated requests (milliseconds)
    ///
    /// When unset, a random delay below `max_random_interval_ms` is used.
    #[serde(default)]
    pub crawl_interval_ms: Option<u64>,

    /// Upper bound for the random inter-request delay (milliseconds)
    #[serde(default = "default_max_random_interval_ms")]
    pub max_random_interval_ms: u64,

    /// Whether sub-comment chains are walked
    #[serde(default = "default_true")]
    pub fetch_sub_comments: bool,

    #[serde(default)]
    pub sort: SearchSortType,

    #[serde(default)]
    pub note_type: SearchNoteType,

    /// How many times a broken session may be rebuilt by a full login; 0 disables rebuilds
    #[serde(default = "default_max_session_rebuilds")]
    pub max_session_rebuilds: u32,
}

/// Login configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginConfig {
    #[serde(default)]
    pub mode: LoginMode,

    /// Phone number for SMS login
    #[serde(default)]
    pub phone: Option<String>,

    /// Preset `web_session` cookie value
    #[serde(default)]
    pub web_session: Option<String>,

    /// Attempt ceiling for the session-marker poll
    #[serde(default = "default_qr_poll_attempts")]
    pub qr_poll_attempts: u32,

    /// Interval between polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Budget for waiting on an SMS code (seconds)
    #[serde(default = "default_sms_code_timeout_secs")]
    pub sms_code_timeout_secs: u32,

    /// Delay after login before the session is used (milliseconds)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Prefix of the code channel key, followed by the phone number
    #[serde(default = "default_code_key_prefix")]
    pub code_key_prefix: String,
}

/// Platform endpoints and request identity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    /// Page opened in the browser (login and signing surface)
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// API host every request is sent to
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// User agent; a random desktop agent is used when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional HTTP proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Browser connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Attach to an already running browser on this debugging port
    #[serde(default)]
    pub debug_port: Option<u16>,

    /// Launch in headless mode when no debugging port is given
    #[serde(default = "default_true")]
    pub headless: bool,
}

/// Redis connection used as the SMS code channel
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Reply posted to every crawled note
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReplyConfig {
    pub content: String,

    /// Pause after each reply (milliseconds)
    #[serde(default = "default_reply_delay_ms")]
    pub delay_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Where the login QR code image is written
    #[serde(default = "default_qr_image_path")]
    pub qr_image_path: String,
}

fn default_true() -> bool {
    true
}
fn default_max_notes() -> u32 {
    20
}
fn default_page_size() -> u32 {
    20
}
fn default_sub_comment_page_size() -> u32 {
    30
}
fn default_max_concurrent_tasks() -> u32 {
    4
}
fn default_max_random_interval_ms() -> u64 {
    1000
}
fn default_max_session_rebuilds() -> u32 {
    1
}

fn default_qr_poll_attempts() -> u32 {
    30
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_sms_code_timeout_secs() -> u32 {
    120
}
fn default_settle_delay_ms() -> u64 {
    5000
}
fn default_code_key_prefix() -> String {
    "xhs_".to_string()
}
fn default_index_url() -> String {
    "https://www.xiaohongshu.com".to_string()
}
fn default_api_host() -> String {
    "https://edith.xiaohongshu.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_reply_delay_ms() -> u64 {
    3000
}
fn default_database_path() -> String {
    "./media_crawler.db".to_string()
}
fn default_qr_image_path() -> String {
    "./login_qrcode.png".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_notes: default_max_notes(),
            page_size: default_page_size(),
            sub_comment_page_size: default_sub_comment_page_size(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            crawl_interval_ms: None,
            max_random_interval_ms: default_max_random_interval_ms(),
            fetch_sub_comments: true,
            sort: SearchSortType::default(),
            note_type: SearchNoteType::default(),
            max_session_rebuilds: default_max_session_rebuilds(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            mode: LoginMode::default(),
            phone: None,
            web_session: None,
            qr_poll_attempts: default_qr_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            sms_code_timeout_secs: default_sms_code_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            code_key_prefix: default_code_key_prefix(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            api_host: default_api_host(),
            user_agent: None,
            timeout_secs: default_timeout_secs(),
            proxy: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: None,
            headless: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            qr_image_path: default_qr_image_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            login: LoginConfig::default(),
            platform: PlatformConfig::default(),
            browser: BrowserConfig::default(),
            redis: None,
            reply: None,
            output: OutputConfig::default(),
            keywords: Vec::new(),
        }
    }
}

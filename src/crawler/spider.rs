//! Platform spiders
//!
//! A spider owns everything one platform needs for a run: the browser page,
//! the login state machine, the signed API client and the scheduler. The
//! [`PlatformSpider`] enum dispatches to the concrete spider by `match`.

use crate::auth::{
    AuthSessionManager, CodeChannel, FileQrDisplay, LoginMode, LoginSettings, QrDisplay,
    RedisCodeChannel,
};
use crate::browser::{BrowserSurface, ChromiumSurface};
use crate::client::{random_user_agent, ApiClient, BrowserSigningOracle, SigningOracle, XhsClient};
use crate::config::Config;
use crate::crawler::report::CrawlReport;
use crate::crawler::scheduler::CrawlScheduler;
use crate::models::{Comment, SearchQuery};
use crate::state::Session;
use crate::storage::{with_sink, RunStatus, SharedSink};
use crate::{CrawlerError, Severity};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Platforms a spider exists for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Platform {
    /// Xiaohongshu
    #[default]
    Xhs,
}

/// Lifecycle shared by every platform spider
#[async_trait]
pub trait Spider: Send {
    /// Opens the browser surface and the collaborators the login needs
    async fn initialize(&mut self) -> Result<(), CrawlerError>;

    /// Logs in and prepares the API client
    async fn authenticate(&mut self) -> Result<Arc<Session>, CrawlerError>;

    /// Note ids matching `keyword`, at most `max-notes` of them
    async fn search(&self, keyword: &str) -> Result<Vec<String>, CrawlerError>;

    /// Every comment of a note, replies included
    async fn fetch_comments(&self, note_id: &str) -> Result<Vec<Comment>, CrawlerError>;

    /// Crawls every configured keyword and returns one report per keyword
    async fn run(&mut self) -> Result<Vec<CrawlReport>, CrawlerError>;
}

/// Spider for Xiaohongshu
pub struct XhsSpider {
    config: Config,
    config_hash: String,
    user_agent: String,
    sink: SharedSink,
    scheduler: CrawlScheduler,
    surface: Option<Arc<dyn BrowserSurface>>,
    oracle: Option<Arc<dyn SigningOracle>>,
    code_channel: Option<Arc<dyn CodeChannel>>,
    qr_display: Arc<dyn QrDisplay>,
    auth: Option<AuthSessionManager>,
    client: Option<XhsClient>,
}

impl XhsSpider {
    pub fn new(config: Config, config_hash: impl Into<String>, sink: SharedSink) -> Self {
        let user_agent = config
            .platform
            .user_agent
            .clone()
            .unwrap_or_else(|| random_user_agent().to_string());
        let scheduler = CrawlScheduler::from_config(&config.crawler, config.reply.as_ref());
        let qr_display = Arc::new(FileQrDisplay::new(config.output.qr_image_path.as_str()));
        Self {
            config,
            config_hash: config_hash.into(),
            user_agent,
            sink,
            scheduler,
            surface: None,
            oracle: None,
            code_channel: None,
            qr_display,
            auth: None,
            client: None,
        }
    }

    /// Uses an existing browser surface instead of launching Chromium
    pub fn with_surface(mut self, surface: Arc<dyn BrowserSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Uses `oracle` instead of signing inside the browser page
    pub fn with_signing_oracle(mut self, oracle: Arc<dyn SigningOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_code_channel(mut self, channel: Arc<dyn CodeChannel>) -> Self {
        self.code_channel = Some(channel);
        self
    }

    pub fn with_qr_display(mut self, display: Arc<dyn QrDisplay>) -> Self {
        self.qr_display = display;
        self
    }

    /// Stops paging and scheduling once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.scheduler = self.scheduler.with_cancellation(token);
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn client(&self) -> Result<&XhsClient, CrawlerError> {
        self.client.as_ref().ok_or_else(|| CrawlerError::LoginFailed {
            mode: self.config.login.mode.to_string(),
            reason: "spider is not authenticated".to_string(),
        })
    }

    /// Replaces a rejected session with a fresh login
    async fn rebuild_session(&mut self) -> Result<(), CrawlerError> {
        self.client = None;
        if let Some(auth) = self.auth.as_mut() {
            auth.invalidate()?;
        }
        if let Some(surface) = &self.surface {
            surface.navigate(&self.config.platform.index_url).await?;
        }
        self.authenticate().await?;
        Ok(())
    }

    async fn crawl_once(
        &self,
        keyword: &str,
        run_id: i64,
        replied: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlerError> {
        let note_ids = self.search(keyword).await?;
        report.notes_found = note_ids.len() as u64;
        info!(keyword = %keyword, notes = note_ids.len(), "Search finished");

        let client = self.client()?;
        self.scheduler
            .run(client, &self.sink, run_id, &note_ids, replied, report)
            .await
    }

    /// Crawls one keyword, rebuilding the session when the platform rejects it
    async fn crawl_keyword(&mut self, keyword: &str) -> Result<CrawlReport, CrawlerError> {
        let run_id = with_sink(&self.sink, |s| s.begin_run(keyword, &self.config_hash))?;
        info!(keyword = %keyword, run_id, "Crawling keyword");

        let mut total = CrawlReport::new(keyword);
        let mut replied = HashSet::new();
        let max_rebuilds = self.config.crawler.max_session_rebuilds;

        let result = loop {
            let mut attempt = CrawlReport::new(keyword);
            let outcome = self
                .crawl_once(keyword, run_id, &mut replied, &mut attempt)
                .await;
            total.absorb(&attempt);
            match outcome {
                Ok(()) => break Ok(()),
                Err(e)
                    if e.severity() == Severity::SessionFatal
                        && total.session_rebuilds < max_rebuilds =>
                {
                    total.session_rebuilds += 1;
                    warn!(
                        keyword = %keyword,
                        error = %e,
                        "Session rejected, logging in again ({}/{})",
                        total.session_rebuilds,
                        max_rebuilds
                    );
                    if let Err(e) = self.rebuild_session().await {
                        break Err(e);
                    }
                }
                Err(e) => break Err(e),
            }
        };

        let status = match &result {
            Ok(()) => RunStatus::Completed,
            Err(CrawlerError::Cancelled) => RunStatus::Interrupted,
            Err(_) => RunStatus::Failed,
        };
        with_sink(&self.sink, |s| s.finish_run(run_id, status, &total))?;
        info!("Run {} {}: {}", run_id, status.to_db_string(), total);

        result.map(|()| total)
    }
}

#[async_trait]
impl Spider for XhsSpider {
    async fn initialize(&mut self) -> Result<(), CrawlerError> {
        let surface = match self.surface.clone() {
            Some(surface) => surface,
            None => {
                let surface: Arc<dyn BrowserSurface> = Arc::new(
                    ChromiumSurface::open(&self.config.browser, &self.config.platform, &self.user_agent)
                        .await?,
                );
                self.surface = Some(Arc::clone(&surface));
                surface
            }
        };

        if self.oracle.is_none() {
            self.oracle = Some(Arc::new(BrowserSigningOracle::new(Arc::clone(&surface))));
        }

        if self.config.login.mode == LoginMode::Phone && self.code_channel.is_none() {
            if let Some(redis) = &self.config.redis {
                let channel = RedisCodeChannel::connect(&redis.url).await?;
                self.code_channel = Some(Arc::new(channel));
            }
        }

        let mut auth = AuthSessionManager::new(
            surface,
            Arc::clone(&self.qr_display),
            LoginSettings::from_config(&self.config.login),
        );
        if let Some(channel) = &self.code_channel {
            auth = auth.with_code_channel(Arc::clone(channel));
        }
        self.auth = Some(auth);
        info!("Spider initialized (user agent: {})", self.user_agent);
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<Arc<Session>, CrawlerError> {
        if self.auth.is_none() {
            self.initialize().await?;
        }
        let auth = self.auth.as_mut().ok_or_else(|| {
            CrawlerError::Browser("browser surface was not initialized".to_string())
        })?;
        let session = auth.authenticate().await?;

        let oracle = self.oracle.clone().ok_or_else(|| CrawlerError::Signing {
            path: String::new(),
            message: "no signing oracle available".to_string(),
        })?;
        let api = ApiClient::new(
            &self.config.platform,
            &self.user_agent,
            Arc::clone(&session),
            oracle,
        )?;
        self.client = Some(XhsClient::new(api));
        info!(cookies = session.cookies().len(), "Session established");
        Ok(session)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<String>, CrawlerError> {
        let crawler = &self.config.crawler;
        let query = SearchQuery::new(keyword, crawler.page_size, crawler.sort, crawler.note_type)?;
        self.scheduler
            .engine()
            .walk_search(self.client()?, query, crawler.max_notes as usize)
            .await
    }

    async fn fetch_comments(&self, note_id: &str) -> Result<Vec<Comment>, CrawlerError> {
        self.scheduler
            .engine()
            .walk_comments(self.client()?, note_id)
            .await
    }

    async fn run(&mut self) -> Result<Vec<CrawlReport>, CrawlerError> {
        if self.client.is_none() {
            self.authenticate().await?;
        }

        let keywords = self.config.keywords.clone();
        let mut reports = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            match self.crawl_keyword(&keyword).await {
                Ok(report) => reports.push(report),
                Err(e) if e.is_recoverable() => {
                    warn!(keyword = %keyword, error = %e, "Keyword skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }
}

/// Spider selected by platform
pub enum PlatformSpider {
    Xhs(XhsSpider),
}

impl PlatformSpider {
    pub fn new(platform: Platform, config: Config, config_hash: &str, sink: SharedSink) -> Self {
        match platform {
            Platform::Xhs => Self::Xhs(XhsSpider::new(config, config_hash, sink)),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Xhs(_) => Platform::Xhs,
        }
    }
}

#[async_trait]
impl Spider for PlatformSpider {
    async fn initialize(&mut self) -> Result<(), CrawlerError> {
        match self {
            Self::Xhs(spider) => spider.initialize().await,
        }
    }

    async fn authenticate(&mut self) -> Result<Arc<Session>, CrawlerError> {
        match self {
            Self::Xhs(spider) => spider.authenticate().await,
        }
    }

    async fn search(&self, keyword: &str) -> Result<Vec<String>, CrawlerError> {
        match self {
            Self::Xhs(spider) => spider.search(keyword).await,
        }
    }

    async fn fetch_comments(&self, note_id: &str) -> Result<Vec<Comment>, CrawlerError> {
        match self {
            Self::Xhs(spider) => spider.fetch_comments(note_id).await,
        }
    }

    async fn run(&mut self) -> Result<Vec<CrawlReport>, CrawlerError> {
        match self {
            Self::Xhs(spider) => spider.run().await,
        }
    }
}

//! Login state machine
//!
//! A login runs `Unauthenticated -> Pending(mode) -> Authenticated`, or ends
//! in the terminal `LoginFailed`. Confirmation is observed by watching the
//! `web_session` cookie: the platform replaces the guest value once the
//! login goes through.

use crate::auth::{CodeChannel, LoginMode, QrDisplay};
use crate::browser::{BrowserSurface, CookieSpec};
use crate::config::LoginConfig;
use crate::state::{AuthState, Session, SigningContext, SESSION_MARKER_COOKIE};
use crate::CrawlerError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const QR_IMAGE_SELECTOR: &str = "div.login-container > div.left > div.qrcode > img";
pub const PHONE_INPUT_SELECTOR: &str = "label.phone > input";
pub const SEND_CODE_SELECTOR: &str = "label.auth-code > span";
pub const CODE_INPUT_SELECTOR: &str = "label.auth-code > input";
pub const AGREEMENT_SELECTOR: &str = "div.agreements svg";
pub const SUBMIT_SELECTOR: &str = "div.input-container > button";

/// Domain the preset session cookie is injected for
pub const COOKIE_DOMAIN: &str = ".xiaohongshu.com";

/// Local-storage key holding the browser fingerprint used for signing
const FINGERPRINT_STORAGE_KEY: &str = "b1";

/// Result of the bounded confirmation poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The session marker changed on this attempt (1-based)
    Confirmed { attempt: u32 },
    /// Every attempt saw the baseline marker
    Exhausted { attempts: u32 },
}

impl PollOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Timing and credentials of a login
#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub mode: LoginMode,
    pub phone: Option<String>,
    pub web_session: Option<String>,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    /// Number of code-channel polls, one per `poll_interval`
    pub code_ticks: u32,
    pub settle_delay: Duration,
    /// Pause between form interactions
    pub step_delay: Duration,
    pub code_key_prefix: String,
}

impl LoginSettings {
    pub fn from_config(config: &LoginConfig) -> Self {
        Self {
            mode: config.mode,
            phone: config.phone.clone(),
            web_session: config.web_session.clone(),
            poll_attempts: config.qr_poll_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            code_ticks: config.sms_code_timeout_secs,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            step_delay: Duration::from_millis(500),
            code_key_prefix: config.code_key_prefix.clone(),
        }
    }
}

/// Owns the login state and the current session
pub struct AuthSessionManager {
    surface: Arc<dyn BrowserSurface>,
    qr_display: Arc<dyn QrDisplay>,
    code_channel: Option<Arc<dyn CodeChannel>>,
    settings: LoginSettings,
    state: AuthState,
    session: Option<Arc<Session>>,
}

impl AuthSessionManager {
    pub fn new(
        surface: Arc<dyn BrowserSurface>,
        qr_display: Arc<dyn QrDisplay>,
        settings: LoginSettings,
    ) -> Self {
        Self {
            surface,
            qr_display,
            code_channel: None,
            settings,
            state: AuthState::Unauthenticated,
            session: None,
        }
    }

    /// Attaches the channel SMS codes are read from
    pub fn with_code_channel(mut self, channel: Arc<dyn CodeChannel>) -> Self {
        self.code_channel = Some(channel);
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn mode(&self) -> LoginMode {
        self.settings.mode
    }

    /// The current session, if authenticated
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.clone()
    }

    /// Moves into `Pending(mode)`
    pub fn start(&mut self, mode: LoginMode) -> Result<(), CrawlerError> {
        self.state.transition(AuthState::Pending(mode))
    }

    /// Runs the configured login to completion and returns the new session
    ///
    /// Any failure leaves the manager in `LoginFailed`; there is no fallback
    /// to another mode.
    pub async fn authenticate(&mut self) -> Result<Arc<Session>, CrawlerError> {
        let mode = self.settings.mode;
        self.start(mode)?;
        info!("Logging in (mode: {})", mode);

        let outcome = match mode {
            LoginMode::QrCode => self.login_by_qrcode().await,
            LoginMode::Phone => self.login_by_phone().await,
            LoginMode::Cookie => self.login_by_cookie().await,
        };

        match outcome {
            Ok(PollOutcome::Confirmed { attempt }) => {
                self.state.transition(AuthState::Authenticated)?;
                info!("Login confirmed after {} poll(s)", attempt);
            }
            Ok(PollOutcome::Exhausted { attempts }) => {
                self.state.transition(AuthState::LoginFailed)?;
                return Err(CrawlerError::LoginFailed {
                    mode: mode.to_string(),
                    reason: format!("session not confirmed after {} attempts", attempts),
                });
            }
            Err(e) => {
                self.state.transition(AuthState::LoginFailed)?;
                return Err(e);
            }
        }

        if !self.settings.settle_delay.is_zero() {
            info!(
                "Waiting {:?} for the platform to settle the session",
                self.settings.settle_delay
            );
            sleep(self.settings.settle_delay).await;
        }

        let session = Arc::new(self.snapshot().await?);
        self.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drops the current session after the platform rejected it
    pub fn invalidate(&mut self) -> Result<(), CrawlerError> {
        self.state.transition(AuthState::Unauthenticated)?;
        self.session = None;
        warn!("Session invalidated");
        Ok(())
    }

    /// Polls the cookie jar until the session marker differs from `baseline`
    ///
    /// Makes at most `poll_attempts` checks, sleeping `poll_interval` between
    /// them, so it returns within attempts × interval.
    pub async fn confirm_login(&self, baseline: Option<&str>) -> Result<PollOutcome, CrawlerError> {
        let attempts = self.settings.poll_attempts;
        for attempt in 1..=attempts {
            let cookies = self.surface.cookies().await?;
            let current = cookies.session_marker();
            if current != baseline {
                return Ok(PollOutcome::Confirmed { attempt });
            }
            debug!("Login not confirmed yet (attempt {}/{})", attempt, attempts);
            if attempt < attempts {
                sleep(self.settings.poll_interval).await;
            }
        }
        Ok(PollOutcome::Exhausted { attempts })
    }

    async fn baseline_marker(&self) -> Result<Option<String>, CrawlerError> {
        let cookies = self.surface.cookies().await?;
        Ok(cookies.session_marker().map(str::to_string))
    }

    async fn login_by_qrcode(&self) -> Result<PollOutcome, CrawlerError> {
        let image_src = self
            .surface
            .attribute(QR_IMAGE_SELECTOR, "src")
            .await?
            .filter(|src| !src.is_empty())
            .ok_or_else(|| CrawlerError::LoginFailed {
                mode: LoginMode::QrCode.to_string(),
                reason: "login QR code not found on the page".to_string(),
            })?;

        let baseline = self.baseline_marker().await?;
        self.qr_display.show(&image_src).await?;
        info!("Waiting for the QR code to be scanned");
        self.confirm_login(baseline.as_deref()).await
    }

    async fn login_by_phone(&self) -> Result<PollOutcome, CrawlerError> {
        let failed = |reason: &str| CrawlerError::LoginFailed {
            mode: LoginMode::Phone.to_string(),
            reason: reason.to_string(),
        };
        let phone = self
            .settings
            .phone
            .clone()
            .ok_or_else(|| failed("no phone number configured"))?;
        let channel = self
            .code_channel
            .clone()
            .ok_or_else(|| failed("no code channel configured"))?;

        let baseline = self.baseline_marker().await?;

        self.surface.fill(PHONE_INPUT_SELECTOR, &phone).await?;
        sleep(self.settings.step_delay).await;
        self.surface.click(SEND_CODE_SELECTOR).await?;
        info!("SMS code requested for {}", phone);

        let key = format!("{}{}", self.settings.code_key_prefix, phone);
        let code = match self.wait_for_code(channel.as_ref(), &key).await {
            Some(code) => code,
            None => {
                return Err(failed(&format!(
                    "no SMS code under {} within {} polls",
                    key, self.settings.code_ticks
                )))
            }
        };

        self.surface.fill(CODE_INPUT_SELECTOR, &code).await?;
        sleep(self.settings.step_delay).await;
        self.surface.click(AGREEMENT_SELECTOR).await?;
        sleep(self.settings.step_delay).await;
        self.surface.click(SUBMIT_SELECTOR).await?;

        self.confirm_login(baseline.as_deref()).await
    }

    /// Busy-polls the code channel, one tick per `poll_interval`
    async fn wait_for_code(&self, channel: &dyn CodeChannel, key: &str) -> Option<String> {
        let mut remaining = self.settings.code_ticks;
        while remaining > 0 {
            debug!("Waiting for SMS code under {} ({} polls left)", key, remaining);
            sleep(self.settings.poll_interval).await;
            match channel.get(key).await {
                Ok(Some(code)) if !code.trim().is_empty() => return Some(code.trim().to_string()),
                Ok(_) => {}
                Err(e) => warn!("Reading SMS code failed: {}", e),
            }
            remaining -= 1;
        }
        None
    }

    async fn login_by_cookie(&self) -> Result<PollOutcome, CrawlerError> {
        let value = self
            .settings
            .web_session
            .clone()
            .ok_or_else(|| CrawlerError::LoginFailed {
                mode: LoginMode::Cookie.to_string(),
                reason: "no web_session value configured".to_string(),
            })?;
        self.surface
            .add_cookie(&CookieSpec {
                name: SESSION_MARKER_COOKIE.to_string(),
                value,
                domain: COOKIE_DOMAIN.to_string(),
                path: "/".to_string(),
            })
            .await?;
        Ok(PollOutcome::Confirmed { attempt: 0 })
    }

    async fn snapshot(&self) -> Result<Session, CrawlerError> {
        let cookies = self.surface.cookies().await?;
        let b1 = self.surface.local_storage_item(FINGERPRINT_STORAGE_KEY).await?;
        let signing = SigningContext::from_cookies(&cookies, b1);
        if signing.a1.is_empty() {
            warn!("Session has no a1 cookie; signed requests may be rejected");
        }
        Ok(Session::new(cookies, signing))
    }
}

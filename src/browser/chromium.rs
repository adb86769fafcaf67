//! Chromium-backed browser surface (Chrome DevTools Protocol)

use crate::browser::{BrowserSurface, CookieSpec};
use crate::config::{BrowserConfig, PlatformConfig};
use crate::state::CookieJar;
use crate::CrawlerError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// How many times an element lookup is retried while the page renders
const FIND_ATTEMPTS: u32 = 20;
const FIND_INTERVAL: Duration = Duration::from_millis(500);

/// A single page in a Chromium instance
pub struct ChromiumSurface {
    _browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSurface {
    /// Attaches to a running browser on `port` or launches a new one, then
    /// opens the platform index page
    pub async fn open(
        browser: &BrowserConfig,
        platform: &PlatformConfig,
        user_agent: &str,
    ) -> Result<Self, CrawlerError> {
        let (instance, mut handler) = match browser.debug_port {
            Some(port) => {
                let browser_url = format!("http://localhost:{}", port);
                info!("Connecting to browser at {}", browser_url);
                Browser::connect(&browser_url)
                    .await
                    .map_err(|e| CrawlerError::Browser(format!("connect failed: {}", e)))?
            }
            None => {
                let mut builder = LaunchConfig::builder().args(vec![
                    "--disable-gpu",
                    "--no-sandbox",
                    "--disable-dev-shm-usage",
                ]);
                if browser.headless {
                    builder = builder.new_headless_mode();
                } else {
                    builder = builder.with_head();
                }
                let config = builder
                    .build()
                    .map_err(|e| CrawlerError::Browser(format!("invalid launch config: {}", e)))?;
                info!("Launching browser (headless: {})", browser.headless);
                Browser::launch(config)
                    .await
                    .map_err(|e| CrawlerError::Browser(format!("launch failed: {}", e)))?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = instance
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlerError::Browser(format!("new page failed: {}", e)))?;
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| CrawlerError::Browser(format!("set user agent failed: {}", e)))?;
        let surface = Self {
            _browser: instance,
            page,
            handler,
        };
        surface.navigate(&platform.index_url).await?;
        info!("Browser page opened at {}", platform.index_url);
        Ok(surface)
    }

    /// Finds an element, waiting for the page to render it
    async fn find(&self, selector: &str) -> Result<Element, CrawlerError> {
        let mut last_error = String::new();
        for attempt in 1..=FIND_ATTEMPTS {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) => {
                    debug!("Element {} not found (attempt {}): {}", selector, attempt, e);
                    last_error = e.to_string();
                }
            }
            sleep(FIND_INTERVAL).await;
        }
        Err(CrawlerError::Browser(format!(
            "element {} not found: {}",
            selector, last_error
        )))
    }
}

impl Drop for ChromiumSurface {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserSurface for ChromiumSurface {
    async fn navigate(&self, url: &str) -> Result<(), CrawlerError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CrawlerError::Browser(format!("navigation to {} failed: {}", url, e)))?;
        Ok(())
    }

    async fn cookies(&self) -> Result<CookieJar, CrawlerError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| CrawlerError::Browser(format!("reading cookies failed: {}", e)))?;
        Ok(CookieJar::from_pairs(
            cookies.into_iter().map(|cookie| (cookie.name, cookie.value)),
        ))
    }

    async fn add_cookie(&self, cookie: &CookieSpec) -> Result<(), CrawlerError> {
        let param = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .domain(cookie.domain.clone())
            .path(cookie.path.clone())
            .build()
            .map_err(|e| CrawlerError::Browser(format!("invalid cookie: {}", e)))?;
        self.page
            .set_cookie(param)
            .await
            .map_err(|e| CrawlerError::Browser(format!("setting cookie failed: {}", e)))?;
        Ok(())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, CrawlerError> {
        let element = self.find(selector).await?;
        element
            .attribute(name)
            .await
            .map_err(|e| CrawlerError::Browser(format!("reading {} of {}: {}", name, selector, e)))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), CrawlerError> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| CrawlerError::Browser(format!("focusing {}: {}", selector, e)))?;
        element
            .type_str(value)
            .await
            .map_err(|e| CrawlerError::Browser(format!("typing into {}: {}", selector, e)))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), CrawlerError> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| CrawlerError::Browser(format!("clicking {}: {}", selector, e)))?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, CrawlerError> {
        let result = self
            .page
            .evaluate(expression.to_string())
            .await
            .map_err(|e| CrawlerError::Browser(format!("script evaluation failed: {}", e)))?;
        // `undefined` carries no value
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }
}

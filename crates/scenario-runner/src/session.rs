//! Browser session lifecycle
//!
//! A session is the layered resource chain engine -> browser -> context ->
//! page. Each layer is acquired on demand, memoized, and released in reverse
//! order. The automation backend sits behind the driver traits below so the
//! lifecycle can be exercised without a real browser.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::{RunnerError, RunnerResult};

/// Launch flags giving every run the same rendering environment
pub const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--start-fullscreen",
    "--kiosk",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--force-device-scale-factor=1.5",
    "--high-dpi-support=1",
    "--force-color-profile=srgb",
    "--disable-web-security",
    "--ignore-certificate-errors",
    "--disable-features=VizDisplayCompositor",
    "--app=about:blank",
];

/// Element query understood by every backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(path) => write!(f, "xpath={}", path),
        }
    }
}

/// Supported `browserType` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    /// Headless Chromium
    Chromium,
    /// Chromium with a visible window
    ChromiumGui,
}

impl BrowserKind {
    pub fn parse(value: &str) -> RunnerResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "chromium" => Ok(BrowserKind::Chromium),
            "chromiumgui" => Ok(BrowserKind::ChromiumGui),
            other => Err(RunnerError::UnsupportedBrowserType(other.to_string())),
        }
    }

    pub fn headless(&self) -> bool {
        matches!(self, BrowserKind::Chromium)
    }
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub kind: BrowserKind,
    pub args: Vec<String>,
}

impl LaunchOptions {
    pub fn for_kind(kind: BrowserKind) -> Self {
        Self {
            kind,
            args: LAUNCH_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Entry point of an automation backend
#[async_trait]
pub trait Automation: Send + Sync {
    async fn start(&self) -> RunnerResult<Box<dyn Engine>>;
}

#[async_trait]
pub trait Engine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> RunnerResult<Box<dyn BrowserDriver>>;
    async fn stop(&self) -> RunnerResult<()>;
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open an isolated browsing context (separate cookies and storage).
    async fn new_context(&self) -> RunnerResult<Box<dyn ContextDriver>>;
    async fn close(&self) -> RunnerResult<()>;
}

#[async_trait]
pub trait ContextDriver: Send + Sync {
    async fn new_page(&self) -> RunnerResult<Box<dyn PageDriver>>;
    async fn close(&self) -> RunnerResult<()>;
}

/// Primitive page operations; everything richer lives in [`crate::pages`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn title(&self) -> RunnerResult<String>;
    async fn url(&self) -> RunnerResult<String>;
    async fn goto(&self, url: &str) -> RunnerResult<()>;
    /// Wait until the page has settled after a navigation.
    async fn wait_until_ready(&self, timeout: Duration) -> RunnerResult<()>;
    /// Text content of every match, in document order.
    async fn texts(&self, locator: &Locator) -> RunnerResult<Vec<String>>;
    async fn click(&self, locator: &Locator) -> RunnerResult<()>;
    /// Replace the value of an input.
    async fn fill(&self, locator: &Locator, text: &str) -> RunnerResult<()>;
    async fn close(&self) -> RunnerResult<()>;
}

/// Owner of the layered session handles
pub struct SessionManager {
    automation: Arc<dyn Automation>,
    config: Arc<ConfigStore>,
    engine: Option<Box<dyn Engine>>,
    browser: Option<Box<dyn BrowserDriver>>,
    context: Option<Box<dyn ContextDriver>>,
    page: Option<Box<dyn PageDriver>>,
}

impl SessionManager {
    pub fn new(automation: Arc<dyn Automation>, config: Arc<ConfigStore>) -> Self {
        Self {
            automation,
            config,
            engine: None,
            browser: None,
            context: None,
            page: None,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub async fn ensure_engine(&mut self) -> RunnerResult<()> {
        if self.engine.is_none() {
            debug!("Starting automation engine");
            self.engine = Some(self.automation.start().await.map_err(acquisition)?);
        }
        Ok(())
    }

    pub async fn ensure_browser(&mut self) -> RunnerResult<()> {
        if self.browser.is_some() {
            return Ok(());
        }
        self.ensure_engine().await?;

        let kind = BrowserKind::parse(&self.config.get_ui("browserType")?)?;
        let engine = self.engine.as_ref().ok_or_else(|| missing_layer("engine"))?;
        let browser = engine
            .launch(&LaunchOptions::for_kind(kind))
            .await
            .map_err(acquisition)?;

        info!(?kind, "Browser launched");
        self.browser = Some(browser);
        Ok(())
    }

    pub async fn ensure_context(&mut self) -> RunnerResult<()> {
        if self.context.is_some() {
            return Ok(());
        }
        self.ensure_browser().await?;

        let browser = self.browser.as_ref().ok_or_else(|| missing_layer("browser"))?;
        self.context = Some(browser.new_context().await.map_err(acquisition)?);
        debug!("Browser context created");
        Ok(())
    }

    pub async fn ensure_page(&mut self) -> RunnerResult<()> {
        let alive = match &self.page {
            Some(page) => page.title().await.is_ok(),
            None => false,
        };
        if alive {
            return Ok(());
        }

        if let Some(stale) = self.page.take() {
            warn!("Cached page did not respond; opening a new one");
            release("page", stale.close().await);
        }
        self.ensure_context().await?;

        let context = self.context.as_ref().ok_or_else(|| missing_layer("context"))?;
        self.page = Some(context.new_page().await.map_err(acquisition)?);
        debug!("Page opened");
        Ok(())
    }

    /// Current page, acquiring every missing layer first. A cached page that
    /// fails a liveness probe is replaced transparently.
    pub async fn page(&mut self) -> RunnerResult<&dyn PageDriver> {
        self.ensure_page().await?;
        self.page.as_deref().ok_or_else(|| missing_layer("page"))
    }

    /// Start a case-scoped session: a fresh context and page on the shared
    /// browser.
    pub async fn create_session(&mut self) -> RunnerResult<()> {
        self.end_session().await;
        self.ensure_page().await
    }

    /// Release the page and context. Never fails.
    pub async fn end_session(&mut self) {
        if let Some(page) = self.page.take() {
            release("page", page.close().await);
        }
        if let Some(context) = self.context.take() {
            release("context", context.close().await);
        }
    }

    /// Release every layer, newest first, and return to the empty state.
    /// Never fails.
    pub async fn close(&mut self) {
        self.end_session().await;
        if let Some(browser) = self.browser.take() {
            release("browser", browser.close().await);
        }
        if let Some(engine) = self.engine.take() {
            release("engine", engine.stop().await);
        }
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn has_browser(&self) -> bool {
        self.browser.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_none() && self.browser.is_none() && self.context.is_none() && self.page.is_none()
    }
}

fn release(layer: &str, result: RunnerResult<()>) {
    if let Err(e) = result {
        warn!(layer, error = %e, "Ignoring teardown failure");
    }
}

fn acquisition(err: RunnerError) -> RunnerError {
    match err {
        RunnerError::SessionAcquisitionFailed(_) => err,
        other => RunnerError::SessionAcquisitionFailed(other.to_string()),
    }
}

fn missing_layer(layer: &str) -> RunnerError {
    RunnerError::SessionAcquisitionFailed(format!("{} layer unavailable", layer))
}

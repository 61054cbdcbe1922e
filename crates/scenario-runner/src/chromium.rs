//! Chromium backend over the Chrome DevTools Protocol

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, GrantPermissionsParams, PermissionType,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::error::{RunnerError, RunnerResult};
use crate::session::{
    Automation, BrowserDriver, ContextDriver, Engine, LaunchOptions, Locator, PageDriver,
};

/// Chromium automation backend
#[derive(Debug, Clone, Default)]
pub struct Chromium {
    /// Browser binary; auto-detected when unset
    pub executable: Option<PathBuf>,
}

impl Chromium {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl Automation for Chromium {
    async fn start(&self) -> RunnerResult<Box<dyn Engine>> {
        Ok(Box::new(ChromiumEngine {
            executable: self.executable.clone(),
        }))
    }
}

struct ChromiumEngine {
    executable: Option<PathBuf>,
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn launch(&self, options: &LaunchOptions) -> RunnerResult<Box<dyn BrowserDriver>> {
        let mut builder = BrowserConfig::builder()
            .args(options.args.clone())
            .viewport(None::<Viewport>);
        if !options.kind.headless() {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(RunnerError::SessionAcquisitionFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RunnerError::SessionAcquisitionFailed(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "CDP handler event error");
                }
            }
        });

        info!("Chromium launched (headless: {})", options.kind.headless());
        Ok(Box::new(ChromiumBrowser {
            browser: Arc::new(Mutex::new(browser)),
            handler_task,
        }))
    }

    /// The browser owns the CDP handler task, so there is nothing left to
    /// release here.
    async fn stop(&self) -> RunnerResult<()> {
        Ok(())
    }
}

struct ChromiumBrowser {
    browser: Arc<Mutex<Browser>>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserDriver for ChromiumBrowser {
    async fn new_context(&self) -> RunnerResult<Box<dyn ContextDriver>> {
        let browser = self.browser.lock().await;
        let created = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(RunnerError::driver)?;
        let id = created.result.browser_context_id.clone();

        let mut grant = GrantPermissionsParams::new(vec![
            PermissionType::ClipboardReadWrite,
            PermissionType::ClipboardSanitizedWrite,
        ]);
        grant.browser_context_id = Some(id.clone());
        if let Err(e) = browser.execute(grant).await {
            debug!(error = %e, "Clipboard permissions not granted");
        }

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            id,
        }))
    }

    async fn close(&self) -> RunnerResult<()> {
        let mut browser = self.browser.lock().await;
        let result = browser.close().await.map_err(RunnerError::driver);
        let _ = browser.wait().await;
        self.handler_task.abort();
        result.map(|_| ())
    }
}

struct ChromiumContext {
    browser: Arc<Mutex<Browser>>,
    id: BrowserContextId,
}

#[async_trait]
impl ContextDriver for ChromiumContext {
    async fn new_page(&self) -> RunnerResult<Box<dyn PageDriver>> {
        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(self.id.clone());

        let page = self
            .browser
            .lock()
            .await
            .new_page(target)
            .await
            .map_err(RunnerError::driver)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> RunnerResult<()> {
        self.browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await
            .map_err(RunnerError::driver)?;
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn elements(&self, locator: &Locator) -> RunnerResult<Vec<Element>> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::XPath(path) => self.page.find_xpaths(path.as_str()).await,
        };
        found.map_err(|e| RunnerError::ElementNotFound {
            locator: format!("{} ({})", locator, e),
            found: 0,
        })
    }

    async fn first(&self, locator: &Locator) -> RunnerResult<Element> {
        self.elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RunnerError::ElementNotFound {
                locator: locator.to_string(),
                found: 0,
            })
    }
}

/// Script collecting `innerText` of every match of a locator.
fn texts_script(locator: &Locator) -> RunnerResult<String> {
    let nodes = match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({}))",
            serde_json::to_string(selector)?
        ),
        Locator::XPath(path) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
            serde_json::to_string(path)?
        ),
    };
    Ok(format!("{}.map(n => n.innerText ?? n.textContent ?? '')", nodes))
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn title(&self) -> RunnerResult<String> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(RunnerError::driver)?
            .unwrap_or_default())
    }

    async fn url(&self) -> RunnerResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(RunnerError::driver)?
            .unwrap_or_default())
    }

    async fn goto(&self, url: &str) -> RunnerResult<()> {
        self.page.goto(url).await.map_err(RunnerError::driver)?;
        Ok(())
    }

    async fn wait_until_ready(&self, timeout: Duration) -> RunnerResult<()> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(result) => result.map(|_| ()).map_err(RunnerError::driver),
            Err(_) => Err(RunnerError::Timeout(format!(
                "page to settle after {} ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn texts(&self, locator: &Locator) -> RunnerResult<Vec<String>> {
        let script = texts_script(locator)?;
        self.page
            .evaluate(script)
            .await
            .map_err(RunnerError::driver)?
            .into_value::<Vec<String>>()
            .map_err(RunnerError::driver)
    }

    async fn click(&self, locator: &Locator) -> RunnerResult<()> {
        self.first(locator)
            .await?
            .click()
            .await
            .map_err(RunnerError::driver)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> RunnerResult<()> {
        let element = self.first(locator).await?;
        element.click().await.map_err(RunnerError::driver)?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(RunnerError::driver)?;
        element.type_str(text).await.map_err(RunnerError::driver)?;
        Ok(())
    }

    async fn close(&self) -> RunnerResult<()> {
        self.page.clone().close().await.map_err(RunnerError::driver)
    }
}

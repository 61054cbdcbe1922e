//! Scripted automation backend for exercising the runner without a browser
//!
//! Every driver call is appended to a shared event log, and element queries
//! are answered from a locator -> texts table.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use scenario_runner::session::{
    Automation, BrowserDriver, ContextDriver, Engine, LaunchOptions, Locator, PageDriver,
};
use scenario_runner::{ConfigStore, RunnerError, RunnerResult};

pub const CONFIG: &str = "\
[UI]
browserType = chromium
baseUrlPortal = http://portal.test
email = qa@example.com
password = s3cret
";

#[derive(Default)]
pub struct FakeState {
    pub events: Vec<String>,
    pub dom: HashMap<Locator, Vec<String>>,
    pub url: String,
    pub redirects: HashMap<Locator, String>,
    pub unclickable: HashSet<Locator>,
    pub dead_pages: HashSet<usize>,
    pub open_pages: HashSet<usize>,
    pub open_contexts: HashSet<usize>,
    pub fail_teardown: bool,
    pub fail_launch: bool,
    next_id: usize,
}

impl FakeState {
    fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::from_ini(CONFIG))
    }

    pub fn set_texts(&self, locator: Locator, texts: &[&str]) {
        self.state
            .lock()
            .dom
            .insert(locator, texts.iter().map(|t| t.to_string()).collect());
    }

    /// Make clicking `locator` change the page URL.
    pub fn redirect_on_click(&self, locator: Locator, url: &str) {
        self.state.lock().redirects.insert(locator, url.to_string());
    }

    pub fn make_unclickable(&self, locator: Locator) {
        self.state.lock().unclickable.insert(locator);
    }

    /// Every page opened so far stops answering.
    pub fn crash_pages(&self) {
        let mut state = self.state.lock();
        let open: Vec<usize> = state.open_pages.iter().copied().collect();
        state.dead_pages.extend(open);
    }

    pub fn fail_teardown(&self) {
        self.state.lock().fail_teardown = true;
    }

    pub fn fail_launch(&self) {
        self.state.lock().fail_launch = true;
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn open_handles(&self) -> usize {
        let state = self.state.lock();
        state.open_pages.len() + state.open_contexts.len()
    }

    fn record(&self, event: impl Into<String>) {
        self.state.lock().events.push(event.into());
    }
}

#[async_trait]
impl Automation for FakeBrowser {
    async fn start(&self) -> RunnerResult<Box<dyn Engine>> {
        self.record("engine.start");
        Ok(Box::new(FakeEngine(self.clone())))
    }
}

struct FakeEngine(FakeBrowser);

#[async_trait]
impl Engine for FakeEngine {
    async fn launch(&self, options: &LaunchOptions) -> RunnerResult<Box<dyn BrowserDriver>> {
        if self.0.state.lock().fail_launch {
            return Err(RunnerError::Driver("chromium binary not found".into()));
        }
        self.0.record(format!("browser.launch headless={}", options.kind.headless()));
        Ok(Box::new(FakeBrowserHandle(self.0.clone())))
    }

    async fn stop(&self) -> RunnerResult<()> {
        self.0.record("engine.stop");
        Ok(())
    }
}

struct FakeBrowserHandle(FakeBrowser);

#[async_trait]
impl BrowserDriver for FakeBrowserHandle {
    async fn new_context(&self) -> RunnerResult<Box<dyn ContextDriver>> {
        let id = {
            let mut state = self.0.state.lock();
            let id = state.next_id();
            state.open_contexts.insert(id);
            id
        };
        self.0.record(format!("context.open#{}", id));
        Ok(Box::new(FakeContext { fake: self.0.clone(), id }))
    }

    async fn close(&self) -> RunnerResult<()> {
        self.0.record("browser.close");
        teardown_result(&self.0)
    }
}

struct FakeContext {
    fake: FakeBrowser,
    id: usize,
}

#[async_trait]
impl ContextDriver for FakeContext {
    async fn new_page(&self) -> RunnerResult<Box<dyn PageDriver>> {
        let id = {
            let mut state = self.fake.state.lock();
            let id = state.next_id();
            state.open_pages.insert(id);
            id
        };
        self.fake.record(format!("page.open#{}", id));
        Ok(Box::new(FakePage { fake: self.fake.clone(), id }))
    }

    async fn close(&self) -> RunnerResult<()> {
        self.fake.state.lock().open_contexts.remove(&self.id);
        self.fake.record(format!("context.close#{}", self.id));
        teardown_result(&self.fake)
    }
}

struct FakePage {
    fake: FakeBrowser,
    id: usize,
}

impl FakePage {
    fn check_alive(&self) -> RunnerResult<()> {
        if self.fake.state.lock().dead_pages.contains(&self.id) {
            Err(RunnerError::Driver("Target closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn title(&self) -> RunnerResult<String> {
        self.check_alive()?;
        Ok("Fake".into())
    }

    async fn url(&self) -> RunnerResult<String> {
        self.check_alive()?;
        Ok(self.fake.state.lock().url.clone())
    }

    async fn goto(&self, url: &str) -> RunnerResult<()> {
        self.check_alive()?;
        self.fake.state.lock().url = url.to_string();
        self.fake.record(format!("goto:{}", url));
        Ok(())
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> RunnerResult<()> {
        self.check_alive()?;
        self.fake.record("ready");
        Ok(())
    }

    async fn texts(&self, locator: &Locator) -> RunnerResult<Vec<String>> {
        self.check_alive()?;
        Ok(self.fake.state.lock().dom.get(locator).cloned().unwrap_or_default())
    }

    async fn click(&self, locator: &Locator) -> RunnerResult<()> {
        self.check_alive()?;
        let mut state = self.fake.state.lock();
        if state.unclickable.contains(locator) {
            return Err(RunnerError::Driver("element is covered by another element".into()));
        }
        if let Some(url) = state.redirects.get(locator).cloned() {
            state.url = url;
        }
        state.events.push(format!("click:{}", locator));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> RunnerResult<()> {
        self.check_alive()?;
        self.fake.record(format!("fill:{}={}", locator, text));
        Ok(())
    }

    async fn close(&self) -> RunnerResult<()> {
        self.fake.state.lock().open_pages.remove(&self.id);
        self.fake.record(format!("page.close#{}", self.id));
        teardown_result(&self.fake)
    }
}

fn teardown_result(fake: &FakeBrowser) -> RunnerResult<()> {
    if fake.state.lock().fail_teardown {
        Err(RunnerError::Driver("connection reset during teardown".into()))
    } else {
        Ok(())
    }
}

//! Page interaction facade
//!
//! The fixed vocabulary of UI operations used by the step interpreter. Every
//! operation goes through the session's current page, which is acquired on
//! first use.

use std::time::Duration;

use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::locators::{self, login, Column};
use crate::session::{Locator, PageDriver, SessionManager};

/// Upper bound for a page to settle after navigation
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Pages<'s> {
    session: &'s mut SessionManager,
}

impl<'s> Pages<'s> {
    pub fn new(session: &'s mut SessionManager) -> Self {
        Self { session }
    }

    /// Load `url`, optionally waiting for the page to settle.
    pub async fn navigate(&mut self, url: &str, wait_until_ready: bool) -> RunnerResult<()> {
        let page = self.session.page().await?;
        debug!(url, "Navigating");
        page.goto(url).await?;
        if wait_until_ready {
            page.wait_until_ready(READY_TIMEOUT).await?;
        }
        Ok(())
    }

    pub async fn fill_field(&mut self, locator: &Locator, text: &str) -> RunnerResult<()> {
        let page = self.session.page().await?;
        resolve_one(page, locator).await?;
        page.fill(locator, text).await.map_err(|e| not_interactable(locator, e))
    }

    pub async fn click(&mut self, locator: &Locator) -> RunnerResult<()> {
        let page = self.session.page().await?;
        resolve_one(page, locator).await?;
        page.click(locator).await.map_err(|e| not_interactable(locator, e))
    }

    pub async fn current_url(&mut self) -> RunnerResult<String> {
        self.session.page().await?.url().await
    }

    /// Activate the control whose heading reads `section`. Zero or several
    /// matching controls are both rejected.
    pub async fn navigate_to_section(&mut self, section: &str) -> RunnerResult<()> {
        let locator = locators::section_button(section);
        let page = self.session.page().await?;

        let matches = page.texts(&locator).await?.len();
        if matches != 1 {
            return Err(RunnerError::SectionNotFound {
                section: section.to_string(),
                matches,
            });
        }
        page.click(&locator).await.map_err(|e| not_interactable(&locator, e))
    }

    /// Card titles of a board column, in visual order.
    pub async fn list_items_in_section(&mut self, column: &str) -> RunnerResult<Vec<String>> {
        let column = Column::parse(column)?;
        let page = self.session.page().await?;
        let titles = page.texts(&column.item_titles()).await?;
        Ok(titles.iter().map(|t| locators::normalize_space(t)).collect())
    }

    /// Tags of the card titled `title`, trimmed, empty ones dropped.
    pub async fn get_item_tags(&mut self, column: &str, title: &str) -> RunnerResult<Vec<String>> {
        let column = Column::parse(column)?;
        let page = self.session.page().await?;

        if page.texts(&column.item_title(title)).await?.is_empty() {
            return Err(RunnerError::ItemNotFound {
                section: column.heading().to_string(),
                title: title.to_string(),
            });
        }

        let tags = page.texts(&column.item_tags(title)).await?;
        Ok(tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    pub async fn navigate_to_login_page(&mut self) -> RunnerResult<()> {
        let endpoint = self.login_endpoint()?;
        self.navigate(&endpoint, true).await
    }

    pub async fn fill_username(&mut self, username: &str) -> RunnerResult<()> {
        self.fill_field(&login::username_input(), username).await
    }

    pub async fn fill_password(&mut self, password: &str) -> RunnerResult<()> {
        self.fill_field(&login::password_input(), password).await
    }

    pub async fn click_login_button(&mut self) -> RunnerResult<()> {
        self.click(&login::sign_in_button()).await
    }

    /// `<UI.baseUrlPortal>/`, read from the live configuration.
    pub fn login_endpoint(&self) -> RunnerResult<String> {
        Ok(format!("{}/", self.session.config().get_ui("baseUrlPortal")?))
    }
}

async fn resolve_one(page: &dyn PageDriver, locator: &Locator) -> RunnerResult<()> {
    let found = page.texts(locator).await?.len();
    if found == 1 {
        Ok(())
    } else {
        Err(RunnerError::ElementNotFound {
            locator: locator.to_string(),
            found,
        })
    }
}

fn not_interactable(locator: &Locator, err: RunnerError) -> RunnerError {
    match err {
        RunnerError::Driver(reason) => RunnerError::ElementNotInteractable {
            locator: locator.to_string(),
            reason,
        },
        other => other,
    }
}

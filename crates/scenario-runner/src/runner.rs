//! Step interpreter and run orchestration
//!
//! Suites, cases and steps run strictly in declaration order. Each case gets
//! a fresh browser context, stops at its first failing step, and always
//! releases its session before the next case starts. A failing case never
//! stops its siblings.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ConfigStore;
use crate::error::{RunnerError, RunnerResult};
use crate::locators;
use crate::pages::Pages;
use crate::scenario::{Action, Scenario, Step, TestCase, TestSuite};
use crate::session::{Automation, SessionManager};

/// Lifecycle of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Passed | CaseStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Error recorded in the results file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub code: String,
    pub message: String,
}

impl From<&RunnerError> for FailureInfo {
    fn from(e: &RunnerError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Outcome of one attempted step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based position in the case
    pub index: usize,
    pub action: String,
    pub description: Option<String>,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<FailureInfo>,
}

/// Outcome of one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub suite_id: String,
    pub case_id: String,
    pub name: String,
    pub status: CaseStatus,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<FailureInfo>,
}

impl CaseResult {
    fn new(suite: &TestSuite, case: &TestCase) -> Self {
        Self {
            suite_id: suite.id.clone(),
            case_id: case.id.clone(),
            name: case.name.clone(),
            status: CaseStatus::Pending,
            duration_ms: 0,
            steps: Vec::new(),
            error: None,
        }
    }

    fn start(&mut self) {
        debug_assert_eq!(self.status, CaseStatus::Pending);
        self.status = CaseStatus::Running;
    }

    fn finish(&mut self, outcome: Result<(), RunnerError>, started: Instant) {
        debug_assert_eq!(self.status, CaseStatus::Running);
        self.duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => self.status = CaseStatus::Passed,
            Err(e) => {
                self.status = CaseStatus::Failed;
                self.error = Some(FailureInfo::from(&e));
            }
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }
}

/// Result of a full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub cases: Vec<CaseResult>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which suites and cases take part in a run
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub suite: Option<String>,
    pub case: Option<String>,
    pub tag: Option<String>,
}

impl Selection {
    pub fn includes_suite(&self, suite: &TestSuite) -> bool {
        self.suite.as_ref().map_or(true, |id| &suite.id == id)
    }

    pub fn includes_case(&self, case: &TestCase) -> bool {
        self.case.as_ref().map_or(true, |id| &case.id == id)
            && self.tag.as_ref().map_or(true, |tag| case.tags.contains(tag))
    }
}

/// Step interpreter: owns the session and executes scenarios
pub struct TestRunner {
    session: SessionManager,
    config: Arc<ConfigStore>,
    selection: Selection,
}

impl TestRunner {
    pub fn new(automation: Arc<dyn Automation>, config: Arc<ConfigStore>) -> Self {
        Self {
            session: SessionManager::new(automation, Arc::clone(&config)),
            config,
            selection: Selection::default(),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run every selected suite, then release the whole session.
    pub async fn run(&mut self, scenario: &Scenario) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut cases = Vec::new();

        for suite in &scenario.test_suites {
            if !self.selection.includes_suite(suite) {
                continue;
            }
            cases.extend(self.run_suite(suite).await);
        }

        self.session.close().await;

        let passed = cases.iter().filter(|c| c.passed()).count();
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            started_at,
            total: cases.len(),
            passed,
            failed: cases.len() - passed,
            duration_ms: start.elapsed().as_millis() as u64,
            cases,
        };

        info!(
            "Test Results: {} passed, {} failed, {} total ({} ms)",
            summary.passed, summary.failed, summary.total, summary.duration_ms
        );
        summary
    }

    /// Run the selected cases of one suite in order.
    pub async fn run_suite(&mut self, suite: &TestSuite) -> Vec<CaseResult> {
        info!("Running test suite: {}", suite.name);
        let mut results = Vec::new();
        for case in &suite.test_cases {
            if !self.selection.includes_case(case) {
                debug!(case = %case.id, "Skipping unselected case");
                continue;
            }
            let span = info_span!("case", suite = %suite.id, case = %case.id);
            results.push(self.run_case(suite, case).instrument(span).await);
        }
        results
    }

    /// Run one case in its own session. The session is released whatever the
    /// outcome.
    pub async fn run_case(&mut self, suite: &TestSuite, case: &TestCase) -> CaseResult {
        info!("Running test case: {}", case.name);
        let started = Instant::now();
        let mut result = CaseResult::new(suite, case);
        result.start();

        let outcome = match self.session.create_session().await {
            Ok(()) => self.run_steps(case, &mut result.steps).await,
            Err(e) => Err(e),
        };
        self.session.end_session().await;

        match &outcome {
            Ok(()) => info!("Test case {} completed successfully", case.name),
            Err(e) => {
                error!("Test case {} failed: {}", case.name, e);
                debug!(error = ?e, "Case failure detail");
            }
        }
        result.finish(outcome, started);
        result
    }

    /// Execute steps in order, stopping at the first failure.
    async fn run_steps(&mut self, case: &TestCase, results: &mut Vec<StepResult>) -> RunnerResult<()> {
        for (i, step) in case.steps.iter().enumerate() {
            let index = i + 1;
            info!(step = index, action = %step.action, "Executing step {}: {}", index, step.label());

            let started = Instant::now();
            let outcome = self.execute_step(step).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    info!(step = index, "Step {} passed", index);
                    results.push(step_result(index, step, StepStatus::Passed, duration_ms, None));
                }
                Err(e) => {
                    error!(step = index, code = e.code(), "Step {} failed: {}", index, e);
                    results.push(step_result(index, step, StepStatus::Failed, duration_ms, Some(&e)));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Dispatch a single step to the page facade.
    pub async fn execute_step(&mut self, step: &Step) -> RunnerResult<()> {
        let action = step.action()?;
        let config = Arc::clone(&self.config);
        let mut pages = Pages::new(&mut self.session);

        match action {
            Action::NavigateToLoginPage => pages.navigate_to_login_page().await,
            Action::FillUsername(source) => pages.fill_username(&source.resolve(&config)?).await,
            Action::FillPassword(source) => pages.fill_password(&source.resolve(&config)?).await,
            Action::ClickLoginButton => pages.click_login_button().await,
            Action::LogIn { username, password } => {
                pages.navigate_to_login_page().await?;
                pages.fill_username(&username.resolve(&config)?).await?;
                pages.fill_password(&password.resolve(&config)?).await?;
                pages.click_login_button().await
            }
            Action::VerifySuccessfulLogin { wait } => {
                tokio::time::sleep(wait).await;
                let url = pages.current_url().await?;
                if url.contains("/login") || url.contains("signin") {
                    return Err(RunnerError::assertion(format!(
                        "login failed - still on login page. Current URL: {}",
                        url
                    )));
                }
                Ok(())
            }
            Action::NavigateToSection { section } => pages.navigate_to_section(section).await,
            Action::VerifyItemsInSection { column, expected } => {
                let items = pages.list_items_in_section(column).await?;
                let missing: Vec<String> = expected
                    .iter()
                    .map(|title| locators::normalize_space(title))
                    .filter(|title| !items.iter().any(|item| item == title))
                    .collect();
                if !missing.is_empty() {
                    return Err(RunnerError::assertion(format!(
                        "expected {:?} in column '{}', found {:?}",
                        missing, column, items
                    )));
                }
                Ok(())
            }
            Action::ConfirmTags { column, task, tags } => {
                let actual = pages.get_item_tags(column, task).await?;
                let actual_set: BTreeSet<&str> = actual.iter().map(String::as_str).collect();
                if actual_set != tags {
                    return Err(RunnerError::assertion(format!(
                        "tags of '{}' in column '{}': expected {:?}, found {:?}",
                        task, column, tags, actual
                    )));
                }
                Ok(())
            }
        }
    }
}

fn step_result(
    index: usize,
    step: &Step,
    status: StepStatus,
    duration_ms: u64,
    error: Option<&RunnerError>,
) -> StepResult {
    StepResult {
        index,
        action: step.action.clone(),
        description: step.description.clone(),
        status,
        duration_ms,
        error: error.map(FailureInfo::from),
    }
}

/// Write the run summary as pretty JSON into `dir`.
pub fn write_results(summary: &RunSummary, dir: &std::path::Path) -> RunnerResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

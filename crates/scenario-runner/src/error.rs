//! Error types for scenario execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Unsupported browser type: {0}")]
    UnsupportedBrowserType(String),

    #[error("Failed to acquire browser session: {0}")]
    SessionAcquisitionFailed(String),

    #[error("Expected exactly one element for {locator}, found {found}")]
    ElementNotFound { locator: String, found: usize },

    #[error("Element {locator} is not interactable: {reason}")]
    ElementNotInteractable { locator: String, reason: String },

    #[error("Section '{section}' not found ({matches} matching controls)")]
    SectionNotFound { section: String, matches: usize },

    #[error("Unknown section: {0} (expected one of: todo, in-progress, review, done)")]
    UnknownSection(String),

    #[error("Item '{title}' not found in section '{section}'")]
    ItemNotFound { section: String, title: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action '{action}' requires field '{field}'")]
    MissingField { action: String, field: &'static str },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Browser automation error: {0}")]
    Driver(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

impl RunnerError {
    pub fn driver(err: impl std::fmt::Display) -> Self {
        Self::Driver(err.to_string())
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }

    /// Stable identifier recorded in the results file.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "CONFIG_MISSING",
            Self::UnsupportedBrowserType(_) => "UNSUPPORTED_BROWSER_TYPE",
            Self::SessionAcquisitionFailed(_) => "SESSION_ACQUISITION_FAILED",
            Self::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            Self::ElementNotInteractable { .. } => "ELEMENT_NOT_INTERACTABLE",
            Self::SectionNotFound { .. } => "SECTION_NOT_FOUND",
            Self::UnknownSection(_) => "UNKNOWN_SECTION",
            Self::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            Self::UnknownAction(_) => "UNKNOWN_ACTION",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::AssertionFailed(_) => "ASSERTION_FAILED",
            Self::ScenarioParse(_) => "SCENARIO_PARSE",
            Self::Driver(_) => "DRIVER_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

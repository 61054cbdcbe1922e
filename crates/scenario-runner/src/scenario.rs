//! Declarative JSON test scenarios
//!
//! A scenario document holds ordered suites, each suite holds ordered cases
//! and each case holds ordered steps. Steps keep their raw `action` string
//! until execution; [`Step::action`] decodes them into the closed [`Action`]
//! vocabulary so that an unknown action fails the case that contains it
//! rather than the whole load.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ConfigStore, UI_SECTION};
use crate::error::{RunnerError, RunnerResult};

const CONFIG_REFERENCE_PREFIX: &str = "ConfigReader";
const DEFAULT_REDIRECT_WAIT_MS: u64 = 2000;

/// Root of a scenario document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub test_suites: Vec<TestSuite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub test_cases: Vec<TestCase>,
}

/// Unit of session isolation and fail-fast scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
}

/// A single declarative instruction as written in the scenario file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// Password override for `logIn`
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default, alias = "expect")]
    pub expected: Option<Expected>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `expected` accepts a single title or a list of titles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    One(String),
    Many(Vec<String>),
}

impl Expected {
    pub fn items(&self) -> Vec<&str> {
        match self {
            Expected::One(item) => vec![item.as_str()],
            Expected::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Where a step's input value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Literal(String),
    Config { section: String, key: String },
}

impl ValueSource {
    /// Interpret a raw `value` string.
    ///
    /// `ConfigReader` alone refers to `default_key` in `[UI]`,
    /// `ConfigReader.key` to `[UI] key` and `ConfigReader.Section.key` to
    /// `[Section] key`. Anything else is a literal.
    pub fn parse(raw: &str, default_key: &str) -> Self {
        let Some(rest) = raw.trim().strip_prefix(CONFIG_REFERENCE_PREFIX) else {
            return ValueSource::Literal(raw.to_string());
        };

        let rest = rest.trim_start_matches('.');
        match rest.split_once('.') {
            _ if rest.is_empty() => ValueSource::Config {
                section: UI_SECTION.to_string(),
                key: default_key.to_string(),
            },
            Some((section, key)) => ValueSource::Config {
                section: section.to_string(),
                key: key.to_string(),
            },
            None => ValueSource::Config {
                section: UI_SECTION.to_string(),
                key: rest.to_string(),
            },
        }
    }

    /// Resolve against the live configuration.
    pub fn resolve(&self, config: &ConfigStore) -> RunnerResult<String> {
        match self {
            ValueSource::Literal(value) => Ok(value.clone()),
            ValueSource::Config { section, key } => config.get(section, key),
        }
    }
}

/// Closed step vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    NavigateToLoginPage,
    FillUsername(ValueSource),
    FillPassword(ValueSource),
    ClickLoginButton,
    LogIn {
        username: ValueSource,
        password: ValueSource,
    },
    VerifySuccessfulLogin {
        wait: Duration,
    },
    NavigateToSection {
        section: &'a str,
    },
    VerifyItemsInSection {
        column: &'a str,
        expected: Vec<&'a str>,
    },
    ConfirmTags {
        column: &'a str,
        task: &'a str,
        tags: BTreeSet<&'a str>,
    },
}

impl Step {
    /// Decode this step into an [`Action`].
    pub fn action(&self) -> RunnerResult<Action<'_>> {
        let action = match self.action.as_str() {
            "navigateToLoginPage" => Action::NavigateToLoginPage,
            "fillUsername" => Action::FillUsername(ValueSource::parse(self.require_value()?, "email")),
            "fillPassword" => {
                Action::FillPassword(ValueSource::parse(self.require_value()?, "password"))
            }
            "clickLoginButton" => Action::ClickLoginButton,
            "logIn" => Action::LogIn {
                username: ValueSource::parse(
                    self.value.as_deref().unwrap_or(CONFIG_REFERENCE_PREFIX),
                    "email",
                ),
                password: ValueSource::parse(
                    self.password.as_deref().unwrap_or(CONFIG_REFERENCE_PREFIX),
                    "password",
                ),
            },
            "verifySuccessfulLogin" => Action::VerifySuccessfulLogin {
                wait: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_REDIRECT_WAIT_MS)),
            },
            "navigateToSection" => Action::NavigateToSection {
                section: self.require(self.section.as_deref(), "section")?,
            },
            "verifyItemsInSection" => Action::VerifyItemsInSection {
                column: self.require(self.column.as_deref(), "column")?,
                expected: self.require(self.expected.as_ref(), "expected")?.items(),
            },
            "confirmTags" => Action::ConfirmTags {
                column: self.require(self.column.as_deref(), "column")?,
                task: self.require(self.task.as_deref(), "task")?,
                tags: self
                    .require(self.tags.as_ref(), "tags")?
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .collect(),
            },
            other => return Err(RunnerError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// Human-readable label used in logs.
    pub fn label(&self) -> String {
        self.description.clone().unwrap_or_else(|| self.action.clone())
    }

    fn require_value(&self) -> RunnerResult<&str> {
        self.require(self.value.as_deref(), "value")
    }

    fn require<'s, T: ?Sized>(&self, field: Option<&'s T>, name: &'static str) -> RunnerResult<&'s T> {
        field.ok_or_else(|| RunnerError::MissingField {
            action: self.action.clone(),
            field: name,
        })
    }
}

impl Scenario {
    /// Parse a scenario from a JSON string
    pub fn from_json(json: &str) -> RunnerResult<Self> {
        serde_json::from_str(json).map_err(|e| RunnerError::ScenarioParse(e.to_string()))
    }

    /// Parse a scenario from a JSON file
    pub fn from_file(path: &Path) -> RunnerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::ScenarioParse(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| RunnerError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load a scenario file, or every `*.json` file under a directory in
    /// sorted path order.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let scenario = if path.is_dir() {
            let mut files: Vec<_> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
                .map(|e| e.into_path())
                .collect();
            files.sort();

            if files.is_empty() {
                return Err(RunnerError::ScenarioParse(format!(
                    "no scenario files under {}",
                    path.display()
                )));
            }

            let mut test_suites = Vec::new();
            for file in &files {
                test_suites.extend(Self::from_file(file)?.test_suites);
            }
            Scenario { test_suites }
        } else {
            Self::from_file(path)?
        };

        info!("Loaded {} test suites", scenario.test_suites.len());
        Ok(scenario)
    }

    /// Decode every step up front, returning one message per bad step.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for suite in &self.test_suites {
            for case in &suite.test_cases {
                for (i, step) in case.steps.iter().enumerate() {
                    if let Err(e) = step.action() {
                        problems.push(format!("{}/{} step {}: {}", suite.id, case.id, i + 1, e));
                    }
                }
            }
        }
        problems
    }

    pub fn case_count(&self) -> usize {
        self.test_suites.iter().map(|s| s.test_cases.len()).sum()
    }
}

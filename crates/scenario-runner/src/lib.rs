//! Scenario Runner
//!
//! A data-driven UI test runner. Test scenarios are declared as JSON
//! (suites -> cases -> ordered steps) and replayed against a web application
//! through a Chromium session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scenario (JSON)                                            │
//! │    └── testSuites[] -> testCases[] -> steps[] { action }    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner (step interpreter)                              │
//! │    ├── run(scenario) -> RunSummary                          │
//! │    ├── run_case: create_session -> steps -> end_session     │
//! │    └── execute_step(step) -> Pages facade                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pages          navigate / fill / click / sections / tags   │
//! │  SessionManager engine -> browser -> context -> page        │
//! │  Chromium       CDP backend behind the session traits       │
//! │  ConfigStore    lazily loaded INI values                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod chromium;
pub mod config;
pub mod error;
pub mod locators;
pub mod logging;
pub mod pages;
pub mod runner;
pub mod scenario;
pub mod session;

pub use config::ConfigStore;
pub use error::{RunnerError, RunnerResult};
pub use runner::{RunSummary, Selection, TestRunner};
pub use scenario::{Scenario, Step, TestCase, TestSuite};
pub use session::SessionManager;

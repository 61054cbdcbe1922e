//! Scenario runner entry point
//!
//! Loads a JSON scenario, replays every selected case in Chromium and writes
//! `test-results.json` into the reports directory.
//!
//! Exit codes: 0 when every case passed, 1 when a case failed, 2 on a fatal
//! error (scenario missing or malformed, reports not writable).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use scenario_runner::chromium::Chromium;
use scenario_runner::logging::{self, LogConfig};
use scenario_runner::runner::write_results;
use scenario_runner::{ConfigStore, RunnerError, RunnerResult, Scenario, Selection, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "scenario-runner")]
#[command(about = "Replay JSON UI test scenarios against a web application")]
#[command(version)]
struct Args {
    /// Scenario file, or a directory of scenario files
    #[arg(default_value = "./test-data/test-scenarios.json")]
    scenario: PathBuf,

    /// INI configuration file (CONFIGURATION_PATH takes precedence)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for run.log and test-results.json
    #[arg(short, long, env = "SCENARIO_REPORTS_DIR", default_value = "reports")]
    reports_dir: PathBuf,

    /// Run only the suite with this id
    #[arg(long)]
    suite: Option<String>,

    /// Run only the case with this id
    #[arg(long)]
    case: Option<String>,

    /// Run only cases carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Reject scenarios containing undecodable steps before running anything
    #[arg(long)]
    strict: bool,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logging::init(&LogConfig {
        debug: args.debug,
        reports_dir: (!args.no_log_file).then(|| args.reports_dir.clone()),
    });

    match run(args).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Test runner failed: {}", e);
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> RunnerResult<bool> {
    let scenario = Scenario::load(&args.scenario)?;

    if args.strict {
        let problems = scenario.validate();
        if !problems.is_empty() {
            for problem in &problems {
                error!("{}", problem);
            }
            return Err(RunnerError::ScenarioParse(format!(
                "{} invalid step(s) in {}",
                problems.len(),
                args.scenario.display()
            )));
        }
    }

    let config = Arc::new(ConfigStore::new(args.config));
    let selection = Selection {
        suite: args.suite,
        case: args.case,
        tag: args.tag,
    };

    info!("Loaded {} test case(s)", scenario.case_count());
    let mut runner = TestRunner::new(Arc::new(Chromium::new(args.chrome)), config).with_selection(selection);
    let summary = runner.run(&scenario).await;

    write_results(&summary, &args.reports_dir)?;
    Ok(summary.success())
}

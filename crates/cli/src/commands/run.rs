//! Run the search scenario matrix against real browsers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use streamprobe_common::{BrowserKind, DeviceCatalog, HarnessConfig};
use streamprobe_e2e::session::BrowserSession;
use streamprobe_e2e::{ScenarioResult, ScenarioRunner, SearchScenario, SuiteResult, WebDriverSession};
use tracing::info;

use crate::output::{print_error, print_list, print_success, OutputFormat, TableDisplay};

const ERROR_DISPLAY_LENGTH: usize = 60;

#[derive(Args)]
pub struct RunArgs {
    /// Device profiles file
    #[arg(long, default_value = "config/devices.json")]
    pub devices: PathBuf,

    /// Device profile to emulate (repeatable)
    #[arg(short, long = "device", default_value = "pixel_2")]
    pub device: Vec<String>,

    /// Browser to drive (repeatable)
    #[arg(short, long = "browser", default_value = "chrome")]
    pub browser: Vec<BrowserKind>,

    /// Search query (repeatable)
    #[arg(short, long = "query", default_values = ["StarCraft II", "League of Legends", "Dota 2"])]
    pub query: Vec<String>,

    /// Run browsers without a window
    #[arg(long)]
    pub headless: bool,

    /// Directory receiving results.json
    #[arg(long, default_value = "reports")]
    pub reports: PathBuf,
}

/// One line of the run summary
#[derive(Serialize, Clone)]
pub struct ScenarioRow {
    pub scenario: String,
    pub passed: bool,
    pub duration_ms: u64,
    pub screenshots: usize,
    pub gif: Option<PathBuf>,
    pub error: Option<String>,
}

impl From<&ScenarioResult> for ScenarioRow {
    fn from(r: &ScenarioResult) -> Self {
        Self {
            scenario: r.name.clone(),
            passed: r.success,
            duration_ms: r.duration_ms,
            screenshots: r.screenshots.len(),
            gif: r.gif.as_ref().map(|g| g.path.clone()),
            error: r.error.clone(),
        }
    }
}

impl TableDisplay for ScenarioRow {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Result", "Duration", "Screenshots", "GIF", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let error = self.error.clone().unwrap_or_default();
        let error = if error.chars().count() > ERROR_DISPLAY_LENGTH {
            let short: String = error.chars().take(ERROR_DISPLAY_LENGTH).collect();
            format!("{}…", short)
        } else {
            error
        };
        vec![
            self.scenario.clone(),
            if self.passed { "✓ pass" } else { "✗ fail" }.to_string(),
            format!("{:.1}s", self.duration_ms as f64 / 1000.0),
            self.screenshots.to_string(),
            self.gif
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            error,
        ]
    }
}

pub fn summary_rows(suite: &SuiteResult) -> Vec<ScenarioRow> {
    suite.results.iter().map(ScenarioRow::from).collect()
}

/// Run the matrix. Returns whether every scenario passed.
pub fn execute(args: RunArgs, config: &HarnessConfig, format: OutputFormat) -> Result<bool> {
    let catalog = DeviceCatalog::load(&args.devices)
        .with_context(|| format!("loading device profiles from {}", args.devices.display()))?;
    // unknown devices fail before any browser starts
    for name in &args.device {
        catalog.get(name)?;
    }

    let scenarios = SearchScenario::matrix(&args.device, &args.browser, &args.query);
    info!(
        "{} device(s) x {} browser(s) x {} query(ies)",
        args.device.len(),
        args.browser.len(),
        args.query.len()
    );

    let runner = ScenarioRunner::new(config.clone()).with_reports_dir(&args.reports);
    let headless = args.headless;
    let suite = runner.run_all(&scenarios, |scenario| {
        let device = catalog.get(&scenario.device)?;
        let session = WebDriverSession::launch(config, scenario.browser, device, headless)?;
        Ok(Box::new(session) as Box<dyn BrowserSession>)
    });

    let results_path = runner
        .write_results(&suite)
        .context("writing results.json")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suite)?),
        _ => {
            print_list(&summary_rows(&suite), format);
            if suite.all_passed() {
                print_success(&format!("{}/{} scenarios passed", suite.passed, suite.total));
            } else {
                print_error(&format!("{}/{} scenarios failed", suite.failed, suite.total));
            }
            println!("Results: {}", results_path.display());
        }
    }

    Ok(suite.all_passed())
}

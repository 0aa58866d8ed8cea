//! Scenario runner: drives the search flow and collects artifacts

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use streamprobe_common::{BrowserKind, HarnessConfig, LogContext};
use tracing::{error, info, warn};

use crate::artifact::{self, GifArtifact, GifAssembler, ScreenshotArtifact, ScreenshotSequence};
use crate::error::{E2eError, E2eResult, ErrorKind};
use crate::page::BasePage;
use crate::pages::{HomePage, SearchPage, StreamerPage};
use crate::session::BrowserSession;
use crate::wait;

/// One cell of the device x browser x query matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScenario {
    pub device: String,
    pub browser: BrowserKind,
    pub query: String,
}

impl SearchScenario {
    pub fn new(device: impl Into<String>, browser: BrowserKind, query: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            browser,
            query: query.into(),
        }
    }

    /// Every combination, devices outermost
    pub fn matrix(devices: &[String], browsers: &[BrowserKind], queries: &[String]) -> Vec<Self> {
        let mut out = Vec::new();
        for device in devices {
            for browser in browsers {
                for query in queries {
                    out.push(Self::new(device.clone(), *browser, query.clone()));
                }
            }
        }
        out
    }

    /// Stable, filesystem-safe name
    pub fn slug(&self) -> String {
        artifact::sanitize_name(&format!("{}_{}_{}", self.device, self.browser, self.query))
            .to_lowercase()
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub scenario: SearchScenario,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<String>,
    pub screenshot_dir: Option<PathBuf>,
    pub screenshots: Vec<ScreenshotArtifact>,
    pub gif: Option<GifArtifact>,
    pub failure_screenshot: Option<PathBuf>,
    pub final_url: Option<String>,
    pub error: Option<String>,
}

impl ScenarioResult {
    fn harness_failure(scenario: &SearchScenario, err: &E2eError) -> Self {
        Self {
            name: scenario.slug(),
            scenario: scenario.clone(),
            success: false,
            duration_ms: 0,
            steps: Vec::new(),
            screenshot_dir: None,
            screenshots: Vec::new(),
            gif: None,
            failure_screenshot: None,
            final_url: None,
            error: Some(err.to_string()),
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub struct ScenarioRunner {
    config: HarnessConfig,
    reports_dir: PathBuf,
    scroll_pause: Duration,
}

impl ScenarioRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            reports_dir: PathBuf::from("reports"),
            scroll_pause: Duration::from_millis(1500),
        }
    }

    /// Directory receiving `results.json`
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Pause after each scroll of the results list
    pub fn with_scroll_pause(mut self, pause: Duration) -> Self {
        self.scroll_pause = pause;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Parent of the per-run screenshot directories of one scenario
    pub fn screenshot_dir(&self, scenario: &SearchScenario) -> PathBuf {
        self.config.screenshots.path.join(scenario.slug())
    }

    /// Run every scenario on its own session from `connect`
    pub fn run_all<F>(&self, scenarios: &[SearchScenario], mut connect: F) -> SuiteResult
    where
        F: FnMut(&SearchScenario) -> E2eResult<Box<dyn BrowserSession>>,
    {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = match connect(scenario) {
                Ok(session) => self.run(session, scenario),
                Err(e) => {
                    error!("✗ {} - could not start browser: {}", scenario.slug(), e);
                    ScenarioResult::harness_failure(scenario, &e)
                }
            };
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run one scenario. The session is closed afterwards.
    ///
    /// Each run captures into a fresh `<screenshot dir>/<run stamp>` so frames
    /// of earlier runs never end up in this run's GIF.
    pub fn run(&self, session: Box<dyn BrowserSession>, scenario: &SearchScenario) -> ScenarioResult {
        let start = Instant::now();
        let name = scenario.slug();
        let context = LogContext::new(&name, &scenario.device, scenario.browser);
        let run_id = Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let shots_dir = match artifact::create_unique_dir(&self.screenshot_dir(scenario), &run_id) {
            Ok(dir) => dir,
            Err(e) => {
                error!("✗ {} - no screenshot directory: {}", name, e);
                if let Err(e) = session.quit() {
                    warn!("Closing browser for {} failed: {}", name, e);
                }
                return ScenarioResult::harness_failure(scenario, &e);
            }
        };

        let base = BasePage::from_config(session, &self.config).with_context(context.clone());
        let mut sequence = ScreenshotSequence::new(&shots_dir);
        let mut steps = Vec::new();

        let outcome = context.in_scope(|| self.drive(&base, scenario, &mut sequence, &mut steps));

        let (final_url, error, failure_screenshot) = match outcome {
            Ok(url) => (Some(url), None, None),
            Err(e) => {
                let shot = context.in_scope(|| {
                    error!("Scenario {} failed: {}", name, e);
                    artifact::capture_failure(base.session(), &shots_dir, &name)
                });
                (base.current_url().ok(), Some(e.to_string()), shot)
            }
        };

        let gifs = GifAssembler::new(&self.config.gifs.path, self.config.gifs.frame_duration());
        let gif = match gifs.assemble_or_warn(&shots_dir, &name) {
            Ok(gif) => gif,
            Err(e) => {
                warn!("GIF for {} not created: {}", name, e);
                None
            }
        };

        if let Err(e) = base.into_session().quit() {
            warn!("Closing browser for {} failed: {}", name, e);
        }

        ScenarioResult {
            name,
            scenario: scenario.clone(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            screenshot_dir: Some(shots_dir),
            screenshots: sequence.into_artifacts(),
            gif,
            failure_screenshot,
            final_url,
            error,
        }
    }

    fn drive(
        &self,
        base: &BasePage,
        scenario: &SearchScenario,
        shots: &mut ScreenshotSequence,
        steps: &mut Vec<String>,
    ) -> E2eResult<String> {
        let session = base.session();
        let home = HomePage::new(base);
        let search = SearchPage::new(base);
        let streamer = StreamerPage::new(base);

        home.open()?;
        steps.push("open home".to_string());
        shots.capture(session, "home_page")?;

        home.open_search()?;
        steps.push("open search".to_string());
        shots.capture(session, "search_opened")?;

        search.search_for(&scenario.query)?;
        steps.push(format!("search for '{}'", scenario.query));
        shots.capture(session, "search_results")?;

        base.scroll(2, self.scroll_pause)?;
        steps.push("scroll results".to_string());
        shots.capture(session, "after_scroll")?;

        search.select_streamer(0)?;
        steps.push("select streamer".to_string());
        shots.capture(session, "streamer_page")?;

        let gate = streamer.dismiss_mature_content();
        steps.push(format!("mature content: {:?}", gate));
        shots.capture(session, "after_mature_content")?;

        let settings = base.settings();
        wait::poll_until(
            settings.explicit_wait,
            settings.poll_interval,
            "channel URL",
            || Ok(streamer.is_channel_page()?.then_some(())),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::Timeout => E2eError::Navigation(format!(
                "not on a channel page: {}",
                base.current_url().unwrap_or_default()
            )),
            _ => e,
        })?;
        steps.push("verify channel page".to_string());

        base.current_url()
    }

    /// Write suite results to `<reports dir>/results.json`
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.reports_dir, results)
    }
}

/// Write suite results as pretty JSON under `dir`
pub fn write_results(dir: &Path, results: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_is_stable_and_safe() {
        let s = SearchScenario::new("pixel_2", BrowserKind::Chrome, "Star Craft/II");
        assert_eq!(s.slug(), "pixel_2_chrome_star_craft_ii");
    }

    #[test]
    fn test_matrix_size_and_order() {
        let devices = vec!["pixel_2".to_string(), "iphone_12".to_string()];
        let browsers = vec![BrowserKind::Chrome, BrowserKind::Firefox];
        let queries = vec!["zelda".to_string()];
        let m = SearchScenario::matrix(&devices, &browsers, &queries);
        assert_eq!(m.len(), 4);
        assert_eq!(m[0].device, "pixel_2");
        assert_eq!(m[1].browser, BrowserKind::Firefox);
        assert_eq!(m[3].device, "iphone_12");
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let suite = SuiteResult {
            total: 0,
            passed: 0,
            failed: 0,
            duration_ms: 1,
            results: vec![],
        };
        let path = write_results(dir.path(), &suite).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["total"], 0);
        assert!(suite.all_passed());
    }
}

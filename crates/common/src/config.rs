//! Harness configuration
//!
//! Loaded once by the caller (CLI, test fixture) and handed to the core as
//! resolved values. Every section has defaults so a partial YAML file is valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DeviceProfile;

/// Upper bound for the per-candidate existence probe during locator resolution
pub const MAX_LOCATOR_PROBE: Duration = Duration::from_secs(3);

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Entry URL of the application under test
    pub base_url: String,

    /// Wait timings
    pub waits: WaitsConfig,

    /// Screenshot output
    pub screenshots: ScreenshotsConfig,

    /// GIF output
    pub gifs: GifsConfig,

    /// Log output
    pub logs: LoggingConfig,

    /// Retry policy applied at interaction call-sites
    pub retry: RetryConfig,

    /// WebDriver endpoints
    pub webdriver: WebDriverConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "https://m.twitch.tv".to_string(),
            waits: WaitsConfig::default(),
            screenshots: ScreenshotsConfig::default(),
            gifs: GifsConfig::default(),
            logs: LoggingConfig::default(),
            retry: RetryConfig::default(),
            webdriver: WebDriverConfig::default(),
        }
    }
}

/// Wait timings. Whole seconds unless the field name says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitsConfig {
    /// Driver-level implicit wait. Must stay 0: a driver that blocks inside
    /// every lookup defeats the per-candidate probe and the poll cadence.
    pub implicit: u64,

    /// Default explicit wait for facade verbs
    pub explicit: u64,

    /// Poll cadence of the wait engine
    pub poll_interval_ms: u64,

    /// Existence probe per fallback candidate
    pub locator_probe: u64,

    /// Settle time after scrolling an element into view
    pub scroll_settle_ms: u64,
}

impl Default for WaitsConfig {
    fn default() -> Self {
        Self {
            implicit: 0,
            explicit: 10,
            poll_interval_ms: 250,
            locator_probe: 3,
            scroll_settle_ms: 500,
        }
    }
}

impl WaitsConfig {
    pub fn implicit(&self) -> Duration {
        Duration::from_secs(self.implicit)
    }

    pub fn explicit(&self) -> Duration {
        Duration::from_secs(self.explicit)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-candidate probe, never longer than [`MAX_LOCATOR_PROBE`]
    pub fn locator_probe(&self) -> Duration {
        Duration::from_secs(self.locator_probe).min(MAX_LOCATOR_PROBE)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotsConfig {
    pub path: PathBuf,
}

impl Default for ScreenshotsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reports/screenshots"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GifsConfig {
    pub path: PathBuf,

    /// Display time of each frame
    pub frame_duration_ms: u64,
}

impl Default for GifsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reports/gifs"),
            frame_duration_ms: 1000,
        }
    }
}

impl GifsConfig {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory receiving `test_run_<timestamp>.log`
    pub path: PathBuf,

    /// Default filter directive, overridden by RUST_LOG
    pub level: String,

    /// Also write to a log file (console output is always on)
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reports/logs"),
            level: "info".to_string(),
            file: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// chromedriver endpoint
    pub chrome_url: String,

    /// geckodriver endpoint
    pub firefox_url: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            chrome_url: "http://localhost:9515".to_string(),
            firefox_url: "http://localhost:4444".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reject values the core cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.waits.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "waits.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".to_string()));
        }
        if self.waits.implicit > 0 {
            return Err(Error::InvalidConfig(format!(
                "waits.implicit must be 0 (got {}); explicit waits poll the page instead",
                self.waits.implicit
            )));
        }
        Ok(())
    }
}

/// Device profiles keyed by name, as stored in `devices.json`
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, DeviceProfile>,
}

impl DeviceCatalog {
    /// Parse a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let devices: BTreeMap<String, DeviceProfile> = serde_json::from_str(json)?;
        Ok(Self { devices })
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Look up a device, listing the known names on failure
    pub fn get(&self, name: &str) -> Result<&DeviceProfile> {
        self.devices.get(name).ok_or_else(|| Error::UnknownDevice {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceProfile)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.waits.explicit(), Duration::from_secs(10));
        assert_eq!(config.screenshots.path, PathBuf::from("reports/screenshots"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
base_url: https://example.test
waits:
  explicit: 4
screenshots:
  path: out/shots
"#;
        let config = HarnessConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.waits.explicit, 4);
        assert_eq!(config.waits.poll_interval_ms, 250);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.screenshots.path, PathBuf::from("out/shots"));
    }

    #[test]
    fn test_locator_probe_is_capped() {
        let waits = WaitsConfig {
            locator_probe: 30,
            ..Default::default()
        };
        assert_eq!(waits.locator_probe(), MAX_LOCATOR_PROBE);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let yaml = "retry:\n  max_attempts: 0\n";
        assert!(matches!(
            HarnessConfig::from_yaml(yaml),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_implicit_wait_rejected() {
        let yaml = "waits:\n  implicit: 10\n";
        match HarnessConfig::from_yaml(yaml) {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("waits.implicit")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
        assert!(HarnessConfig::from_yaml("waits:\n  implicit: 0\n").is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.base_url, HarnessConfig::default().base_url);
    }

    #[test]
    fn test_device_catalog_lookup() {
        let json = r#"{
            "pixel_2": {"width": 411, "height": 731, "pixelRatio": 2.6, "userAgent": "Pixel"},
            "iphone_12": {"width": 390, "height": 844, "pixelRatio": 3.0, "userAgent": "iPhone"}
        }"#;
        let catalog = DeviceCatalog::from_json(json).unwrap();
        assert_eq!(catalog.get("pixel_2").unwrap().width, 411);

        match catalog.get("nokia") {
            Err(Error::UnknownDevice { available, .. }) => {
                assert_eq!(available, "iphone_12, pixel_2");
            }
            other => panic!("expected UnknownDevice, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_config_files_parse() {
        let config = HarnessConfig::from_yaml(include_str!("../../../config/config.yaml")).unwrap();
        assert_eq!(config.waits.locator_probe(), MAX_LOCATOR_PROBE);

        let catalog = DeviceCatalog::from_json(include_str!("../../../config/devices.json")).unwrap();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, vec!["iphone_12", "pixel_2", "samsung_s20"]);
    }
}

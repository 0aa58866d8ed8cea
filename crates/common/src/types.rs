//! Core types shared across StreamProbe crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Locators
// ============================================================================

/// How a locator value is interpreted by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Css,
    XPath,
    Id,
    Name,
    ClassName,
    TagName,
    LinkText,
    PartialLinkText,
}

impl LocatorKind {
    /// Short label used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Css => "css",
            LocatorKind::XPath => "xpath",
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::ClassName => "class",
            LocatorKind::TagName => "tag",
            LocatorKind::LinkText => "link",
            LocatorKind::PartialLinkText => "partial-link",
        }
    }
}

/// A single rule for finding one element. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorStrategy {
    kind: LocatorKind,
    value: String,
}

impl LocatorStrategy {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::XPath, value)
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Id, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Name, value)
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::LinkText, value)
    }

    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}'", self.kind.as_str(), self.value)
    }
}

/// A logical UI element and its ordered fallback strategies.
///
/// Order is priority: the first strategy that resolves wins, regardless of
/// where its element sits in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    name: String,
    candidates: Vec<LocatorStrategy>,
}

impl Target {
    /// Create a target with a single strategy
    pub fn new(name: impl Into<String>, strategy: LocatorStrategy) -> Self {
        Self {
            name: name.into(),
            candidates: vec![strategy],
        }
    }

    /// Create a target from an ordered list of strategies.
    ///
    /// Returns `None` when the list is empty.
    pub fn any(
        name: impl Into<String>,
        candidates: impl IntoIterator<Item = LocatorStrategy>,
    ) -> Option<Self> {
        let candidates: Vec<_> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            candidates,
        })
    }

    /// Append a lower-priority fallback
    pub fn or(mut self, strategy: LocatorStrategy) -> Self {
        self.candidates.push(strategy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[LocatorStrategy] {
        &self.candidates
    }

    /// The highest-priority strategy
    pub fn primary(&self) -> &LocatorStrategy {
        &self.candidates[0]
    }
}

impl From<LocatorStrategy> for Target {
    fn from(strategy: LocatorStrategy) -> Self {
        let name = strategy.to_string();
        Self::new(name, strategy)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Browsers and devices
// ============================================================================

/// Supported browser families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        }
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            _ => Err(Error::UnsupportedBrowser(s.to_string())),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mobile device emulation profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    pub user_agent: String,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

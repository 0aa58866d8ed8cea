//! Browser session capability
//!
//! The core drives a browser only through [`BrowserSession`]. The WebDriver
//! adapter and the in-memory fake both implement it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use streamprobe_common::LocatorStrategy;

use crate::error::E2eResult;

/// Opaque reference to a located element.
///
/// Valid for one verb invocation only; the DOM node behind it may go stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Argument passed to an injected script
#[derive(Debug, Clone)]
pub enum ScriptArg {
    Element(ElementHandle),
    Value(serde_json::Value),
}

impl From<&ElementHandle> for ScriptArg {
    fn from(handle: &ElementHandle) -> Self {
        ScriptArg::Element(handle.clone())
    }
}

impl From<i64> for ScriptArg {
    fn from(n: i64) -> Self {
        ScriptArg::Value(serde_json::Value::from(n))
    }
}

/// Browser cookie, W3C field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
        }
    }
}

/// Element position and size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Capability set the interaction core consumes.
///
/// All calls block. `find_by` reports absence as `Ok(None)`; element-scoped
/// calls report a detached node as `E2eError::StaleElement`.
pub trait BrowserSession {
    fn navigate(&self, url: &str) -> E2eResult<()>;

    fn current_url(&self) -> E2eResult<String>;

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> E2eResult<serde_json::Value>;

    fn find_by(&self, strategy: &LocatorStrategy) -> E2eResult<Option<ElementHandle>>;

    fn find_all_by(&self, strategy: &LocatorStrategy) -> E2eResult<Vec<ElementHandle>>;

    fn save_screenshot(&self, path: &Path) -> E2eResult<()>;

    fn cookies(&self) -> E2eResult<Vec<Cookie>>;

    fn set_cookie(&self, cookie: &Cookie) -> E2eResult<()>;

    fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()>;

    /// Native element click
    fn click(&self, element: &ElementHandle) -> E2eResult<()>;

    /// Pointer move to the element centre followed by press and release
    fn pointer_click(&self, element: &ElementHandle) -> E2eResult<()>;

    fn clear(&self, element: &ElementHandle) -> E2eResult<()>;

    fn send_keys(&self, element: &ElementHandle, text: &str) -> E2eResult<()>;

    /// Rendered text
    fn text(&self, element: &ElementHandle) -> E2eResult<String>;

    /// Current `value` property of a form control
    fn value(&self, element: &ElementHandle) -> E2eResult<String>;

    fn is_displayed(&self, element: &ElementHandle) -> E2eResult<bool>;

    fn is_enabled(&self, element: &ElementHandle) -> E2eResult<bool>;

    fn rect(&self, element: &ElementHandle) -> E2eResult<Rect>;

    /// End the session. Further calls fail.
    fn quit(&self) -> E2eResult<()>;
}

//! In-memory browser for tests.
//!
//! A flat list of elements, each matched by exact locator equality. Knobs on
//! [`FakeElement`] reproduce the flakiness real pages show: late rendering,
//! stale references, covered elements and failing click paths.
//!
//! `FakeBrowser` is a cheap handle; clones share one DOM so a test can keep a
//! copy for inspection after handing another to the code under test.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use serde_json::Value;
use streamprobe_common::LocatorStrategy;

use crate::error::{E2eError, E2eResult};
use crate::scripts;
use crate::session::{BrowserSession, Cookie, ElementHandle, Rect, ScriptArg};

/// Which click path delivered a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTier {
    Native,
    Script,
    Pointer,
}

/// Side effect of a successful click
#[derive(Debug, Clone, PartialEq)]
pub enum ClickEffect {
    Navigate(String),
    Remove,
    /// Make the named element displayed
    Reveal(String),
    /// Hide the clicked element
    Hide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    pub name: String,
    pub selectors: Vec<LocatorStrategy>,
    pub text: String,
    pub value: String,
    pub displayed: bool,
    pub enabled: bool,
    pub obscured: bool,
    pub rect: Rect,
    /// Lookups that miss before the element shows up
    pub appear_after: u32,
    /// Element calls that fail as stale before it settles
    pub stale_for: u32,
    pub native_click_fails: bool,
    pub script_click_fails: bool,
    pub pointer_click_fails: bool,
    /// Text that survives a native clear
    pub clear_leaves: Option<String>,
    pub on_click: Option<ClickEffect>,
    pub removed: bool,
    pub clicks: Vec<ClickTier>,
    pub lookups: u32,
}

impl FakeElement {
    pub fn new(name: impl Into<String>, selector: LocatorStrategy) -> Self {
        Self {
            name: name.into(),
            selectors: vec![selector],
            text: String::new(),
            value: String::new(),
            displayed: true,
            enabled: true,
            obscured: false,
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 20.0,
            },
            appear_after: 0,
            stale_for: 0,
            native_click_fails: false,
            script_click_fails: false,
            pointer_click_fails: false,
            clear_leaves: None,
            on_click: None,
            removed: false,
            clicks: Vec::new(),
            lookups: 0,
        }
    }

    /// Also match this selector
    pub fn matching(mut self, selector: LocatorStrategy) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Covered by another node: native clicks are intercepted
    pub fn obscured(mut self) -> Self {
        self.obscured = true;
        self
    }

    pub fn appears_after(mut self, lookups: u32) -> Self {
        self.appear_after = lookups;
        self
    }

    pub fn stale_for(mut self, calls: u32) -> Self {
        self.stale_for = calls;
        self
    }

    pub fn failing_clicks(mut self, native: bool, script: bool, pointer: bool) -> Self {
        self.native_click_fails = native;
        self.script_click_fails = script;
        self.pointer_click_fails = pointer;
        self
    }

    pub fn clear_leaves(mut self, residue: impl Into<String>) -> Self {
        self.clear_leaves = Some(residue.into());
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    fn matches(&self, strategy: &LocatorStrategy) -> bool {
        !self.removed && self.selectors.iter().any(|s| s == strategy)
    }
}

#[derive(Debug)]
struct FakeDom {
    url: String,
    pending_url: Option<(String, u32)>,
    navigation_lag: u32,
    failing_find_all: u32,
    find_all_calls: u32,
    ready_state: String,
    elements: Vec<FakeElement>,
    invalid_selectors: Vec<LocatorStrategy>,
    find_log: Vec<LocatorStrategy>,
    scripts: Vec<String>,
    scroll_by: Vec<(i64, i64)>,
    scrolled_into_view: Vec<String>,
    cookies: Vec<Cookie>,
    window: (u32, u32),
    screenshots: Vec<std::path::PathBuf>,
    fail_screenshots: bool,
    consent_accepted: bool,
    quit: bool,
}

#[derive(Debug, Clone)]
pub struct FakeBrowser {
    dom: Rc<RefCell<FakeDom>>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            dom: Rc::new(RefCell::new(FakeDom {
                url: "about:blank".to_string(),
                pending_url: None,
                navigation_lag: 0,
                failing_find_all: 0,
                find_all_calls: 0,
                ready_state: "complete".to_string(),
                elements: Vec::new(),
                invalid_selectors: Vec::new(),
                find_log: Vec::new(),
                scripts: Vec::new(),
                scroll_by: Vec::new(),
                scrolled_into_view: Vec::new(),
                cookies: Vec::new(),
                window: (40, 60),
                screenshots: Vec::new(),
                fail_screenshots: false,
                consent_accepted: false,
                quit: false,
            })),
        }
    }

    pub fn add(&self, element: FakeElement) -> &Self {
        self.dom.borrow_mut().elements.push(element);
        self
    }

    /// Make lookups with this selector fail as malformed
    pub fn reject_selector(&self, strategy: LocatorStrategy) -> &Self {
        self.dom.borrow_mut().invalid_selectors.push(strategy);
        self
    }

    pub fn set_url(&self, url: &str) {
        self.dom.borrow_mut().url = url.to_string();
    }

    /// Commit each navigation only after `reads` URL reads
    pub fn navigation_lag(&self, reads: u32) {
        self.dom.borrow_mut().navigation_lag = reads;
    }

    /// Time out the next `calls` multi-element lookups
    pub fn fail_find_all(&self, calls: u32) {
        self.dom.borrow_mut().failing_find_all = calls;
    }

    /// Number of multi-element lookups so far
    pub fn find_all_calls(&self) -> u32 {
        self.dom.borrow().find_all_calls
    }

    pub fn set_ready_state(&self, state: &str) {
        self.dom.borrow_mut().ready_state = state.to_string();
    }

    pub fn fail_screenshots(&self) {
        self.dom.borrow_mut().fail_screenshots = true;
    }

    /// Change an element after setup
    pub fn update(&self, name: &str, f: impl FnOnce(&mut FakeElement)) {
        if let Some(el) = self.dom.borrow_mut().elements.iter_mut().find(|e| e.name == name) {
            f(el);
        }
    }

    /// Snapshot of an element by name
    pub fn element(&self, name: &str) -> Option<FakeElement> {
        self.dom.borrow().elements.iter().find(|e| e.name == name).cloned()
    }

    pub fn url(&self) -> String {
        self.dom.borrow().url.clone()
    }

    /// Every strategy looked up, in order
    pub fn find_log(&self) -> Vec<LocatorStrategy> {
        self.dom.borrow().find_log.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.dom.borrow().scripts.clone()
    }

    pub fn scroll_by_calls(&self) -> Vec<(i64, i64)> {
        self.dom.borrow().scroll_by.clone()
    }

    pub fn scrolled_into_view(&self) -> Vec<String> {
        self.dom.borrow().scrolled_into_view.clone()
    }

    pub fn screenshots(&self) -> Vec<std::path::PathBuf> {
        self.dom.borrow().screenshots.clone()
    }

    pub fn window(&self) -> (u32, u32) {
        self.dom.borrow().window
    }

    pub fn consent_accepted(&self) -> bool {
        self.dom.borrow().consent_accepted
    }

    pub fn is_quit(&self) -> bool {
        self.dom.borrow().quit
    }

    fn ensure_open(&self) -> E2eResult<()> {
        if self.dom.borrow().quit {
            return Err(E2eError::webdriver("invalid session id", "session closed"));
        }
        Ok(())
    }

    fn index_of(handle: &ElementHandle) -> E2eResult<usize> {
        handle
            .id()
            .strip_prefix("fake-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| E2eError::webdriver("no such element", handle.id()))
    }

    /// Run `f` on a live element, consuming one stale tick if any remain
    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&mut FakeElement) -> E2eResult<T>,
    ) -> E2eResult<T> {
        self.ensure_open()?;
        let idx = Self::index_of(handle)?;
        let mut dom = self.dom.borrow_mut();
        let el = dom
            .elements
            .get_mut(idx)
            .ok_or_else(|| E2eError::webdriver("no such element", handle.id()))?;
        if el.removed {
            return Err(E2eError::StaleElement(format!("{} was removed", el.name)));
        }
        if el.stale_for > 0 {
            el.stale_for -= 1;
            return Err(E2eError::StaleElement(format!("{} is detached", el.name)));
        }
        f(el)
    }

    fn deliver_click(&self, handle: &ElementHandle, tier: ClickTier) -> E2eResult<()> {
        let effect = self.with_element(handle, |el| {
            let fails = match tier {
                ClickTier::Native => el.native_click_fails || el.obscured,
                ClickTier::Script => el.script_click_fails,
                ClickTier::Pointer => el.pointer_click_fails,
            };
            if fails {
                return Err(E2eError::webdriver(
                    "element click intercepted",
                    format!("{:?} click on {} did not land", tier, el.name),
                ));
            }
            if tier == ClickTier::Native && !el.displayed {
                return Err(E2eError::webdriver(
                    "element not interactable",
                    format!("{} is not displayed", el.name),
                ));
            }
            el.clicks.push(tier);
            Ok(el.on_click.clone())
        })?;

        let mut dom = self.dom.borrow_mut();
        match effect {
            Some(ClickEffect::Navigate(url)) => dom.url = url,
            Some(ClickEffect::Remove) => {
                if let Ok(idx) = Self::index_of(handle) {
                    dom.elements[idx].removed = true;
                }
            }
            Some(ClickEffect::Reveal(name)) => {
                if let Some(el) = dom.elements.iter_mut().find(|e| e.name == name) {
                    el.displayed = true;
                }
            }
            Some(ClickEffect::Hide) => {
                if let Ok(idx) = Self::index_of(handle) {
                    dom.elements[idx].displayed = false;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn check_selector(&self, strategy: &LocatorStrategy) -> E2eResult<()> {
        self.ensure_open()?;
        let mut dom = self.dom.borrow_mut();
        dom.find_log.push(strategy.clone());
        if dom.invalid_selectors.contains(strategy) {
            return Err(E2eError::InvalidSelector(strategy.to_string()));
        }
        Ok(())
    }
}

fn element_arg(args: &[ScriptArg]) -> Option<&ElementHandle> {
    match args.first() {
        Some(ScriptArg::Element(handle)) => Some(handle),
        _ => None,
    }
}

fn number_arg(args: &[ScriptArg], idx: usize) -> i64 {
    match args.get(idx) {
        Some(ScriptArg::Value(v)) => v.as_i64().unwrap_or(0),
        _ => 0,
    }
}

impl BrowserSession for FakeBrowser {
    fn navigate(&self, url: &str) -> E2eResult<()> {
        self.ensure_open()?;
        let mut dom = self.dom.borrow_mut();
        if dom.navigation_lag == 0 {
            dom.url = url.to_string();
        } else {
            dom.pending_url = Some((url.to_string(), dom.navigation_lag));
        }
        Ok(())
    }

    fn current_url(&self) -> E2eResult<String> {
        self.ensure_open()?;
        let mut dom = self.dom.borrow_mut();
        if let Some((url, reads)) = dom.pending_url.take() {
            if reads <= 1 {
                dom.url = url;
            } else {
                dom.pending_url = Some((url, reads - 1));
            }
        }
        Ok(dom.url.clone())
    }

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> E2eResult<Value> {
        self.ensure_open()?;
        self.dom.borrow_mut().scripts.push(script.to_string());

        let missing_arg = || E2eError::webdriver("javascript error", "missing element argument");
        match script {
            scripts::CLICK => {
                let el = element_arg(args).ok_or_else(missing_arg)?;
                self.deliver_click(el, ClickTier::Script)?;
                Ok(Value::Null)
            }
            scripts::READY_STATE => Ok(Value::String(self.dom.borrow().ready_state.clone())),
            scripts::IS_OBSCURED => {
                let el = element_arg(args).ok_or_else(missing_arg)?;
                self.with_element(el, |e| Ok(Value::Bool(e.obscured)))
            }
            scripts::CLEAR_VALUE => {
                let el = element_arg(args).ok_or_else(missing_arg)?;
                self.with_element(el, |e| {
                    e.value.clear();
                    Ok(Value::Null)
                })
            }
            scripts::SCROLL_INTO_VIEW_CENTER => {
                let el = element_arg(args).ok_or_else(missing_arg)?;
                let name = self.with_element(el, |e| Ok(e.name.clone()))?;
                self.dom.borrow_mut().scrolled_into_view.push(name);
                Ok(Value::Null)
            }
            scripts::SCROLL_BY => {
                let delta = (number_arg(args, 0), number_arg(args, 1));
                self.dom.borrow_mut().scroll_by.push(delta);
                Ok(Value::Null)
            }
            scripts::ACCEPT_CONSENT => {
                self.dom.borrow_mut().consent_accepted = true;
                Ok(Value::Bool(true))
            }
            _ => Ok(Value::Null),
        }
    }

    fn find_by(&self, strategy: &LocatorStrategy) -> E2eResult<Option<ElementHandle>> {
        self.check_selector(strategy)?;
        let mut dom = self.dom.borrow_mut();
        for (idx, el) in dom.elements.iter_mut().enumerate() {
            if el.matches(strategy) {
                el.lookups += 1;
                if el.lookups > el.appear_after {
                    return Ok(Some(ElementHandle::new(format!("fake-{}", idx))));
                }
            }
        }
        Ok(None)
    }

    fn find_all_by(&self, strategy: &LocatorStrategy) -> E2eResult<Vec<ElementHandle>> {
        self.check_selector(strategy)?;
        let mut dom = self.dom.borrow_mut();
        dom.find_all_calls += 1;
        if dom.failing_find_all > 0 {
            dom.failing_find_all -= 1;
            return Err(E2eError::Timeout(format!("find all {}", strategy)));
        }
        let mut found = Vec::new();
        for (idx, el) in dom.elements.iter_mut().enumerate() {
            if el.matches(strategy) {
                el.lookups += 1;
                if el.lookups > el.appear_after {
                    found.push(ElementHandle::new(format!("fake-{}", idx)));
                }
            }
        }
        Ok(found)
    }

    fn save_screenshot(&self, path: &Path) -> E2eResult<()> {
        self.ensure_open()?;
        let (count, (w, h), fail) = {
            let dom = self.dom.borrow();
            (dom.screenshots.len(), dom.window, dom.fail_screenshots)
        };
        if fail {
            return Err(E2eError::webdriver("unable to capture screen", "capture disabled"));
        }
        let shade = (count as u8).wrapping_mul(40);
        RgbaImage::from_pixel(w, h, Rgba([shade, 128, 255 - shade, 255])).save(path)?;
        self.dom.borrow_mut().screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn cookies(&self) -> E2eResult<Vec<Cookie>> {
        self.ensure_open()?;
        Ok(self.dom.borrow().cookies.clone())
    }

    fn set_cookie(&self, cookie: &Cookie) -> E2eResult<()> {
        self.ensure_open()?;
        let mut dom = self.dom.borrow_mut();
        dom.cookies.retain(|c| c.name != cookie.name);
        dom.cookies.push(cookie.clone());
        Ok(())
    }

    fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.ensure_open()?;
        self.dom.borrow_mut().window = (width, height);
        Ok(())
    }

    fn click(&self, element: &ElementHandle) -> E2eResult<()> {
        self.deliver_click(element, ClickTier::Native)
    }

    fn pointer_click(&self, element: &ElementHandle) -> E2eResult<()> {
        self.deliver_click(element, ClickTier::Pointer)
    }

    fn clear(&self, element: &ElementHandle) -> E2eResult<()> {
        self.with_element(element, |el| {
            if !el.enabled {
                return Err(E2eError::webdriver("invalid element state", "element is disabled"));
            }
            el.value = el.clear_leaves.clone().unwrap_or_default();
            Ok(())
        })
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        self.with_element(element, |el| {
            if !el.enabled || !el.displayed {
                return Err(E2eError::webdriver(
                    "element not interactable",
                    format!("{} cannot receive keys", el.name),
                ));
            }
            el.value.push_str(text);
            Ok(())
        })
    }

    fn text(&self, element: &ElementHandle) -> E2eResult<String> {
        self.with_element(element, |el| Ok(el.text.clone()))
    }

    fn value(&self, element: &ElementHandle) -> E2eResult<String> {
        self.with_element(element, |el| Ok(el.value.clone()))
    }

    fn is_displayed(&self, element: &ElementHandle) -> E2eResult<bool> {
        self.with_element(element, |el| Ok(el.displayed))
    }

    fn is_enabled(&self, element: &ElementHandle) -> E2eResult<bool> {
        self.with_element(element, |el| Ok(el.enabled))
    }

    fn rect(&self, element: &ElementHandle) -> E2eResult<Rect> {
        self.with_element(element, |el| Ok(el.rect))
    }

    fn quit(&self) -> E2eResult<()> {
        self.dom.borrow_mut().quit = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_element_appears() {
        let browser = FakeBrowser::new();
        let css = LocatorStrategy::css("#late");
        browser.add(FakeElement::new("late", css.clone()).appears_after(2));

        assert!(browser.find_by(&css).unwrap().is_none());
        assert!(browser.find_by(&css).unwrap().is_none());
        assert!(browser.find_by(&css).unwrap().is_some());
    }

    #[test]
    fn test_stale_then_settles() {
        let browser = FakeBrowser::new();
        let css = LocatorStrategy::css("#s");
        browser.add(FakeElement::new("s", css.clone()).with_text("hi").stale_for(1));

        let handle = browser.find_by(&css).unwrap().unwrap();
        assert!(matches!(browser.text(&handle), Err(E2eError::StaleElement(_))));
        assert_eq!(browser.text(&handle).unwrap(), "hi");
    }

    #[test]
    fn test_clones_share_state() {
        let browser = FakeBrowser::new();
        let other = browser.clone();
        other.navigate("https://example.test/").unwrap();
        assert_eq!(browser.url(), "https://example.test/");
    }

    #[test]
    fn test_screenshot_writes_png() {
        use image::GenericImageView;

        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        let path = dir.path().join("shot.png");
        browser.save_screenshot(&path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!(img.dimensions(), (40, 60));
    }
}

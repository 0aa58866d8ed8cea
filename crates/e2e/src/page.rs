//! Element interaction facade
//!
//! `BasePage` owns the browser session and exposes the verbs page objects
//! are built from. Every verb resolves its target fresh; no element handle
//! outlives the call that produced it.

use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use serde_json::Value;
use streamprobe_common::{HarnessConfig, LogContext, Target};
use tracing::span::Entered;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::error::{E2eError, E2eResult, ErrorKind};
use crate::locator::LocatorResolver;
use crate::retry::RetryPolicy;
use crate::scripts;
use crate::session::{BrowserSession, ElementHandle, ScriptArg};
use crate::wait::{self, Condition, Satisfied, WaitSpec};

/// Timing and output settings for a page
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub base_url: String,
    /// Default timeout when a verb gets none
    pub explicit_wait: Duration,
    pub poll_interval: Duration,
    /// Existence probe per fallback candidate
    pub locator_probe: Duration,
    pub scroll_settle: Duration,
    /// Timeout of `is_present`
    pub presence_probe: Duration,
    pub screenshot_dir: PathBuf,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl PageSettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            explicit_wait: config.waits.explicit(),
            poll_interval: config.waits.poll_interval(),
            locator_probe: config.waits.locator_probe(),
            scroll_settle: config.waits.scroll_settle(),
            presence_probe: Duration::from_secs(3),
            screenshot_dir: config.screenshots.path.clone(),
        }
    }
}

/// Outcome of an optional popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    /// Found and clicked away
    Dismissed,
    /// Never showed up
    NotFound,
    /// Showed up but every click path failed
    Undismissed,
}

impl PopupOutcome {
    pub fn is_dismissed(&self) -> bool {
        matches!(self, PopupOutcome::Dismissed)
    }
}

pub struct BasePage {
    session: Box<dyn BrowserSession>,
    settings: PageSettings,
    retry: RetryPolicy,
    resolver: LocatorResolver,
    context: Option<LogContext>,
}

impl BasePage {
    pub fn new(session: Box<dyn BrowserSession>, settings: PageSettings, retry: RetryPolicy) -> Self {
        let resolver = LocatorResolver::new(settings.locator_probe, settings.poll_interval);
        Self {
            session,
            settings,
            retry,
            resolver,
            context: None,
        }
    }

    pub fn from_config(session: Box<dyn BrowserSession>, config: &HarnessConfig) -> Self {
        Self::new(
            session,
            PageSettings::from_config(config),
            RetryPolicy::from_config(&config.retry),
        )
    }

    /// Tag every verb's log lines with this context
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn into_session(self) -> Box<dyn BrowserSession> {
        self.session
    }

    fn enter(&self) -> Option<Entered<'_>> {
        self.context.as_ref().map(|ctx| ctx.span().enter())
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.settings.explicit_wait)
    }

    fn locate(&self, target: &Target, timeout: Duration) -> E2eResult<ElementHandle> {
        Ok(self.resolver.resolve(self.session(), target, timeout)?.element)
    }

    fn wait_for(&self, condition: Condition, timeout: Duration) -> E2eResult<Satisfied> {
        let spec = WaitSpec::new(condition, timeout).poll_every(self.settings.poll_interval);
        wait::wait_until(self.session(), &spec)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Navigate and wait for the document to finish loading
    pub fn open(&self, url: &str) -> E2eResult<()> {
        let _g = self.enter();
        info!("Opening {}", url);
        self.session.navigate(url)?;

        let session = self.session();
        wait::poll_until(
            self.settings.explicit_wait,
            self.settings.poll_interval,
            "document ready",
            || {
                let state = session.execute_script(scripts::READY_STATE, &[])?;
                Ok((state == Value::String("complete".into())).then_some(()))
            },
        )
        .map_err(|e| match e.kind() {
            ErrorKind::Timeout => E2eError::Navigation(format!("{} did not finish loading", url)),
            _ => e,
        })?;

        // the address bar may still show the placeholder of the previous load
        let current = wait::poll_until(
            self.settings.explicit_wait,
            self.settings.poll_interval,
            "navigated URL",
            || {
                let current = session.current_url()?;
                Ok((!is_placeholder_url(&current)).then_some(current))
            },
        )
        .map_err(|e| match e.kind() {
            ErrorKind::Timeout => E2eError::Navigation(format!(
                "{} left the browser at '{}'",
                url,
                session.current_url().unwrap_or_default()
            )),
            _ => e,
        })?;
        debug!("Loaded {}", current);
        Ok(())
    }

    pub fn current_url(&self) -> E2eResult<String> {
        self.session.current_url()
    }

    /// Wait until the URL contains `fragment`
    pub fn wait_for_url_contains(&self, fragment: &str, timeout: Option<Duration>) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.wait_for(Condition::UrlContains(fragment.to_string()), timeout)
            .map(|_| ())
            .map_err(|e| match e.kind() {
                ErrorKind::Timeout => E2eError::Navigation(format!(
                    "URL never contained '{}' within {:.1}s",
                    fragment,
                    timeout.as_secs_f64()
                )),
                _ => e,
            })
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve `target` to a present element
    pub fn find(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<ElementHandle> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry
            .run(&format!("find {}", target), || self.locate(target, timeout))
    }

    /// All elements matched by the first candidate that matches anything
    pub fn find_all(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<Vec<ElementHandle>> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("find all {}", target), || {
            self.resolver.resolve_all(self.session(), target, timeout)
        })
    }

    /// `find_all` without the retry, for callers that retry a larger cycle
    pub(crate) fn find_all_once(
        &self,
        target: &Target,
        timeout: Option<Duration>,
    ) -> E2eResult<Vec<ElementHandle>> {
        let timeout = self.timeout_or_default(timeout);
        self.resolver.resolve_all(self.session(), target, timeout)
    }

    /// Short presence probe
    pub fn is_present(&self, target: &Target) -> bool {
        let _g = self.enter();
        self.resolver
            .resolve(self.session(), target, self.settings.presence_probe)
            .is_ok()
    }

    pub fn wait_visible(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<ElementHandle> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("wait visible {}", target), || {
            Ok(self
                .resolver
                .resolve_with(self.session(), target, timeout, Condition::Visible)?
                .element)
        })
    }

    pub fn wait_clickable(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<ElementHandle> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("wait clickable {}", target), || {
            Ok(self
                .resolver
                .resolve_with(self.session(), target, timeout, Condition::Clickable)?
                .element)
        })
    }

    /// Wait for the first candidate whose text contains `text`
    pub fn wait_for_text(&self, target: &Target, text: &str, timeout: Option<Duration>) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        let budget = self.resolver.per_candidate(target, timeout);
        let mut last = None;
        for strategy in target.candidates() {
            match self.wait_for(Condition::TextContains(strategy.clone(), text.to_string()), budget) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Timeout => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| E2eError::Timeout(format!("text '{}' in {}", text, target))))
    }

    /// Wait until no candidate shows a visible element
    pub fn wait_invisible(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        let session = self.session();
        wait::poll_until(
            timeout,
            self.settings.poll_interval,
            &format!("invisibility of {}", target),
            || {
                for strategy in target.candidates() {
                    if wait::check(session, &Condition::Invisible(strategy.clone()))?.is_none() {
                        return Ok(None);
                    }
                }
                Ok(Some(()))
            },
        )
    }

    pub fn text_of(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<String> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("read text of {}", target), || {
            let el = self.locate(target, timeout)?;
            self.session.text(&el)
        })
    }

    pub fn value_of(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<String> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("read value of {}", target), || {
            let el = self.locate(target, timeout)?;
            self.session.value(&el)
        })
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    /// Click with native, script and pointer fallbacks.
    ///
    /// A stale reference at any tier restarts the resolve-and-click cycle
    /// through the retry policy.
    pub fn click(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        info!("Clicking {}", target);
        self.retry.run(&format!("click {}", target), || {
            let el = self.locate(target, timeout)?;
            self.click_element(target, &el)
        })
    }

    /// Click an already resolved element through the fallback tiers
    pub fn click_element(&self, target: &Target, el: &ElementHandle) -> E2eResult<()> {
        let native = match self.session.click(el) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::StaleElement => return Err(e),
            Err(e) => e,
        };
        warn!("Native click on {} failed ({}), trying script click", target, native);

        let script = match self.session.execute_script(scripts::CLICK, &[ScriptArg::from(el)]) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::StaleElement => return Err(e),
            Err(e) => e,
        };
        warn!("Script click on {} failed ({}), trying pointer click", target, script);

        match self.session.pointer_click(el) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::StaleElement => Err(e),
            Err(pointer) => Err(E2eError::ElementNotClickable {
                target: target.name().to_string(),
                reason: format!("native: {}; script: {}; pointer: {}", native, script, pointer),
            }),
        }
    }

    /// Type into a field, replacing its content when `clear_first` is set
    pub fn input_text(&self, target: &Target, text: &str, clear_first: bool) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.settings.explicit_wait;
        info!("Typing into {}", target);
        self.retry.run(&format!("input into {}", target), || {
            let el = self.locate(target, timeout)?;
            if clear_first {
                self.session.clear(&el).map_err(|e| unusable(target, e))?;
                let leftover = self.session.value(&el).map_err(|e| unusable(target, e))?;
                if !leftover.is_empty() {
                    debug!("{} kept '{}' after clear, clearing by script", target, leftover);
                    self.session
                        .execute_script(scripts::CLEAR_VALUE, &[ScriptArg::from(&el)])
                        .map_err(|e| unusable(target, e))?;
                }
            }
            self.session
                .send_keys(&el, text)
                .map_err(|e| unusable(target, e))
        })
    }

    /// Scroll to the bottom `times` times, pausing `delay` after each
    pub fn scroll(&self, times: u32, delay: Duration) -> E2eResult<()> {
        let _g = self.enter();
        for i in 0..times {
            debug!("Scroll {}/{}", i + 1, times);
            self.session.execute_script(scripts::SCROLL_TO_BOTTOM, &[])?;
            sleep(delay);
        }
        Ok(())
    }

    /// Centre `target` vertically and let the layout settle
    pub fn scroll_to(&self, target: &Target, timeout: Option<Duration>) -> E2eResult<()> {
        let _g = self.enter();
        let timeout = self.timeout_or_default(timeout);
        self.retry.run(&format!("scroll to {}", target), || {
            let el = self.locate(target, timeout)?;
            self.session
                .execute_script(scripts::SCROLL_INTO_VIEW_CENTER, &[ScriptArg::from(&el)])
        })?;
        sleep(self.settings.scroll_settle);
        Ok(())
    }

    /// Centre an element obtained in the current verb
    pub fn scroll_element_into_view(&self, el: &ElementHandle) -> E2eResult<()> {
        self.session
            .execute_script(scripts::SCROLL_INTO_VIEW_CENTER, &[ScriptArg::from(el)])?;
        sleep(self.settings.scroll_settle);
        Ok(())
    }

    pub fn scroll_by(&self, dx: i64, dy: i64) -> E2eResult<()> {
        let _g = self.enter();
        self.session
            .execute_script(scripts::SCROLL_BY, &[ScriptArg::from(dx), ScriptArg::from(dy)])?;
        Ok(())
    }

    /// Dismiss an optional popup. Absence is a normal outcome, not an error.
    pub fn handle_popup(&self, target: &Target, timeout: Duration) -> PopupOutcome {
        let _g = self.enter();
        let el = match self.resolver.resolve(self.session(), target, timeout) {
            Ok(resolved) => resolved.element,
            Err(e) => {
                debug!("Popup {} not shown: {}", target, e);
                return PopupOutcome::NotFound;
            }
        };
        match self.click_element(target, &el) {
            Ok(()) => {
                info!("Dismissed popup {}", target);
                PopupOutcome::Dismissed
            }
            Err(e) => {
                warn!("Popup {} could not be dismissed: {}", target, e);
                PopupOutcome::Undismissed
            }
        }
    }

    /// Capture the viewport to `<screenshot dir>/<name>.png`
    pub fn screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        let _g = self.enter();
        artifact::save_screenshot(self.session(), &self.settings.screenshot_dir, name)
    }

    /// Capture into a specific directory
    pub fn screenshot_in(&self, dir: &Path, name: &str) -> E2eResult<PathBuf> {
        artifact::save_screenshot(self.session(), dir, name)
    }
}

fn is_placeholder_url(url: &str) -> bool {
    url.is_empty() || url == "about:blank" || url.starts_with("data:")
}

/// Input failures other than transient ones mean the field cannot be used
fn unusable(target: &Target, err: E2eError) -> E2eError {
    if err.is_transient() {
        err
    } else {
        E2eError::ElementNotClickable {
            target: target.name().to_string(),
            reason: err.to_string(),
        }
    }
}

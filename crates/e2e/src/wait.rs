//! Wait engine
//!
//! Polls browser state until a condition holds or the timeout elapses. Each
//! tick resolves the element fresh; a handle is only reused for the
//! visibility or clickability check in the same tick it was found.

use std::thread::sleep;
use std::time::{Duration, Instant};

use serde_json::Value;
use streamprobe_common::LocatorStrategy;
use tracing::debug;

use crate::error::{E2eError, E2eResult, ErrorKind};
use crate::scripts;
use crate::session::{BrowserSession, ElementHandle, ScriptArg};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Predicates the engine can wait on
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Element exists in the DOM
    Present(LocatorStrategy),
    /// Element exists, is displayed and has a rendered size
    Visible(LocatorStrategy),
    /// Visible, enabled and not covered by another node
    Clickable(LocatorStrategy),
    /// Element text contains the substring, case-sensitive
    TextContains(LocatorStrategy, String),
    /// Current URL contains the substring
    UrlContains(String),
    /// Element absent, detached or not displayed
    Invisible(LocatorStrategy),
}

impl Condition {
    pub fn describe(&self) -> String {
        match self {
            Condition::Present(s) => format!("presence of {}", s),
            Condition::Visible(s) => format!("visibility of {}", s),
            Condition::Clickable(s) => format!("clickability of {}", s),
            Condition::TextContains(s, text) => format!("text '{}' in {}", text, s),
            Condition::UrlContains(fragment) => format!("URL containing '{}'", fragment),
            Condition::Invisible(s) => format!("invisibility of {}", s),
        }
    }
}

/// One wait request. Built per call, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSpec {
    pub condition: Condition,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitSpec {
    pub fn new(condition: Condition, timeout: Duration) -> Self {
        Self {
            condition,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// What a satisfied wait produced
#[derive(Debug, Clone, PartialEq)]
pub enum Satisfied {
    /// The element that satisfied an element predicate
    Element(ElementHandle),
    /// A predicate with no subject element held
    Condition,
}

impl Satisfied {
    pub fn into_element(self) -> Option<ElementHandle> {
        match self {
            Satisfied::Element(handle) => Some(handle),
            Satisfied::Condition => None,
        }
    }
}

/// Call `probe` every `poll_interval` until it yields a value.
///
/// Stale references during a tick count as "not yet". Fails with
/// `E2eError::Timeout` once at least `timeout` has elapsed; other errors
/// propagate immediately.
pub fn poll_until<T>(
    timeout: Duration,
    poll_interval: Duration,
    what: &str,
    mut probe: impl FnMut() -> E2eResult<Option<T>>,
) -> E2eResult<T> {
    let start = Instant::now();
    let mut ticks = 0u32;

    loop {
        ticks += 1;
        match probe() {
            Ok(Some(value)) => {
                debug!("{} satisfied after {} tick(s)", what, ticks);
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) if e.kind() == ErrorKind::StaleElement => {
                debug!("Stale reference while waiting for {}", what);
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(E2eError::Timeout(format!(
                "{} after {:.1}s",
                what,
                timeout.as_secs_f64()
            )));
        }
        sleep(poll_interval.min(timeout - elapsed).max(Duration::from_millis(1)));
    }
}

/// Block until `spec.condition` holds.
pub fn wait_until(session: &dyn BrowserSession, spec: &WaitSpec) -> E2eResult<Satisfied> {
    let what = spec.condition.describe();
    poll_until(spec.timeout, spec.poll_interval, &what, || {
        check(session, &spec.condition)
    })
}

/// Evaluate a condition once against current state
pub fn check(session: &dyn BrowserSession, condition: &Condition) -> E2eResult<Option<Satisfied>> {
    let found = match condition {
        Condition::Present(strategy) => session.find_by(strategy)?,
        Condition::Visible(strategy) => match session.find_by(strategy)? {
            Some(el) if is_visible(session, &el)? => Some(el),
            _ => None,
        },
        Condition::Clickable(strategy) => match session.find_by(strategy)? {
            Some(el) if is_clickable(session, &el)? => Some(el),
            _ => None,
        },
        Condition::TextContains(strategy, text) => match session.find_by(strategy)? {
            Some(el) if session.text(&el)?.contains(text.as_str()) => Some(el),
            _ => None,
        },
        Condition::UrlContains(fragment) => {
            let url = session.current_url()?;
            return Ok(url.contains(fragment.as_str()).then_some(Satisfied::Condition));
        }
        Condition::Invisible(strategy) => {
            let gone = match session.find_by(strategy)? {
                None => true,
                Some(el) => match is_visible(session, &el) {
                    Ok(visible) => !visible,
                    Err(e) if e.kind() == ErrorKind::StaleElement => true,
                    Err(e) => return Err(e),
                },
            };
            return Ok(gone.then_some(Satisfied::Condition));
        }
    };
    Ok(found.map(Satisfied::Element))
}

fn is_visible(session: &dyn BrowserSession, el: &ElementHandle) -> E2eResult<bool> {
    Ok(session.is_displayed(el)? && session.rect(el)?.has_area())
}

fn is_clickable(session: &dyn BrowserSession, el: &ElementHandle) -> E2eResult<bool> {
    if !is_visible(session, el)? || !session.is_enabled(el)? {
        return Ok(false);
    }
    let obscured = session.execute_script(scripts::IS_OBSCURED, &[ScriptArg::from(el)])?;
    Ok(!matches!(obscured, Value::Bool(true)))
}

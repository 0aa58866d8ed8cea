//! Locator strategy resolution
//!
//! Tries a target's candidates in priority order and returns the first that
//! yields an element. Candidates are probed one after another, never raced;
//! document order of the matched elements plays no part.

use std::time::Duration;

use streamprobe_common::config::MAX_LOCATOR_PROBE;
use streamprobe_common::{LocatorStrategy, Target};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult, ErrorKind};
use crate::session::{BrowserSession, ElementHandle};
use crate::wait::{wait_until, Condition, WaitSpec, DEFAULT_POLL_INTERVAL};

/// The strategy that won and the element it found
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub strategy: LocatorStrategy,
    pub index: usize,
    pub element: ElementHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorResolver {
    probe: Duration,
    poll_interval: Duration,
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::new(MAX_LOCATOR_PROBE, DEFAULT_POLL_INTERVAL)
    }
}

impl LocatorResolver {
    /// `probe` is capped at [`MAX_LOCATOR_PROBE`]
    pub fn new(probe: Duration, poll_interval: Duration) -> Self {
        Self {
            probe: probe.min(MAX_LOCATOR_PROBE),
            poll_interval,
        }
    }

    /// Time allowed for each candidate.
    ///
    /// A lone strategy gets the whole budget; with fallbacks each candidate
    /// gets the short existence probe.
    pub fn per_candidate(&self, target: &Target, timeout: Duration) -> Duration {
        if target.candidates().len() > 1 {
            timeout.min(self.probe)
        } else {
            timeout
        }
    }

    /// Find the first candidate whose element is present
    pub fn resolve(
        &self,
        session: &dyn BrowserSession,
        target: &Target,
        timeout: Duration,
    ) -> E2eResult<Resolved> {
        self.resolve_with(session, target, timeout, Condition::Present)
    }

    /// Find the first candidate satisfying `condition`
    pub fn resolve_with(
        &self,
        session: &dyn BrowserSession,
        target: &Target,
        timeout: Duration,
        condition: fn(LocatorStrategy) -> Condition,
    ) -> E2eResult<Resolved> {
        let budget = self.per_candidate(target, timeout);

        for (index, strategy) in target.candidates().iter().enumerate() {
            let spec = WaitSpec::new(condition(strategy.clone()), budget)
                .poll_every(self.poll_interval);

            match wait_until(session, &spec) {
                Ok(satisfied) => {
                    if let Some(element) = satisfied.into_element() {
                        if index > 0 {
                            debug!("{} resolved by fallback #{}: {}", target, index, strategy);
                        }
                        return Ok(Resolved {
                            strategy: strategy.clone(),
                            index,
                            element,
                        });
                    }
                }
                Err(e) if e.kind() == ErrorKind::Timeout => {
                    debug!("{} not matched by {}", target, strategy);
                }
                Err(e) if e.kind() == ErrorKind::InvalidSelector => {
                    warn!("{} skipped malformed locator {}: {}", target, strategy, e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(E2eError::ElementNotFound {
            target: target.name().to_string(),
            attempted: target.candidates().iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Elements for the first candidate that matches anything.
    ///
    /// Returns an empty list when no candidate matches within its budget.
    pub fn resolve_all(
        &self,
        session: &dyn BrowserSession,
        target: &Target,
        timeout: Duration,
    ) -> E2eResult<Vec<ElementHandle>> {
        match self.resolve(session, target, timeout) {
            Ok(resolved) => session.find_all_by(&resolved.strategy),
            Err(E2eError::ElementNotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeBrowser, FakeElement};
    use std::time::Instant;
    use test_case::test_case;

    fn fast() -> LocatorResolver {
        LocatorResolver::new(Duration::from_millis(30), Duration::from_millis(5))
    }

    fn target_of(n: usize) -> Target {
        Target::any("box", (0..n).map(|i| LocatorStrategy::css(format!("#c{}", i))))
            .unwrap()
    }

    #[test_case(4, 0 ; "first wins")]
    #[test_case(4, 1 ; "second wins")]
    #[test_case(4, 3 ; "last wins")]
    fn test_selects_exactly_the_first_working_candidate(n: usize, winner: usize) {
        let browser = FakeBrowser::new();
        // every candidate from the winner onward would match
        for i in winner..n {
            browser.add(FakeElement::new(format!("el{}", i), LocatorStrategy::css(format!("#c{}", i))));
        }

        let resolved = fast()
            .resolve(&browser, &target_of(n), Duration::from_secs(1))
            .unwrap();
        assert_eq!(resolved.index, winner);
        assert_eq!(resolved.strategy.value(), format!("#c{}", winner));

        // later candidates were never consulted
        let later = LocatorStrategy::css(format!("#c{}", winner + 1));
        assert!(!browser.find_log().contains(&later));
    }

    #[test]
    fn test_priority_beats_document_order() {
        let browser = FakeBrowser::new();
        browser.add(FakeElement::new("first-in-dom", LocatorStrategy::css("#c1")));
        browser.add(FakeElement::new("second-in-dom", LocatorStrategy::css("#c0")));

        let resolved = fast()
            .resolve(&browser, &target_of(2), Duration::from_secs(1))
            .unwrap();
        assert_eq!(resolved.index, 0);
    }

    #[test]
    fn test_not_found_carries_all_attempts() {
        let browser = FakeBrowser::new();
        let err = fast()
            .resolve(&browser, &target_of(3), Duration::from_secs(1))
            .unwrap_err();
        match err {
            E2eError::ElementNotFound { target, attempted } => {
                assert_eq!(target, "box");
                assert_eq!(attempted, vec!["css='#c0'", "css='#c1'", "css='#c2'"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_probe_bounds_each_candidate() {
        let browser = FakeBrowser::new();
        let start = Instant::now();
        let _ = fast().resolve(&browser, &target_of(3), Duration::from_secs(10));
        // three 30ms probes, not three 10s waits
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_single_candidate_gets_full_timeout() {
        let resolver = fast();
        let single = Target::new("one", LocatorStrategy::css("#a"));
        assert_eq!(
            resolver.per_candidate(&single, Duration::from_secs(7)),
            Duration::from_secs(7)
        );
        assert_eq!(
            resolver.per_candidate(&target_of(2), Duration::from_secs(7)),
            Duration::from_millis(30)
        );
    }

    #[test]
    fn test_probe_never_exceeds_cap() {
        let resolver = LocatorResolver::new(Duration::from_secs(20), DEFAULT_POLL_INTERVAL);
        assert_eq!(
            resolver.per_candidate(&target_of(2), Duration::from_secs(30)),
            MAX_LOCATOR_PROBE
        );
    }

    #[test]
    fn test_malformed_candidate_is_skipped() {
        let browser = FakeBrowser::new();
        browser.reject_selector(LocatorStrategy::css("#c0"));
        browser.add(FakeElement::new("ok", LocatorStrategy::css("#c1")));

        let resolved = fast()
            .resolve(&browser, &target_of(2), Duration::from_secs(1))
            .unwrap();
        assert_eq!(resolved.index, 1);
    }

    #[test]
    fn test_late_rendering_within_probe() {
        let browser = FakeBrowser::new();
        browser.add(FakeElement::new("late", LocatorStrategy::css("#c0")).appears_after(2));

        let resolved = fast()
            .resolve(&browser, &target_of(2), Duration::from_secs(1))
            .unwrap();
        assert_eq!(resolved.index, 0);
    }
}

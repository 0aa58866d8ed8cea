//! Interaction tests against the in-memory browser
//!
//! Exercise fallback resolution, retries and the click escalation through
//! the public `BasePage` surface only.

use std::time::{Duration, Instant};

use streamprobe_common::{LocatorStrategy, Target};
use streamprobe_e2e::fake::{ClickEffect, ClickTier, FakeBrowser, FakeElement};
use streamprobe_e2e::{scripts, BasePage, E2eError, PageSettings, PopupOutcome, RetryPolicy};

fn page(browser: &FakeBrowser, retry: RetryPolicy) -> BasePage {
    BasePage::new(
        Box::new(browser.clone()),
        PageSettings {
            base_url: "https://m.example.test".to_string(),
            explicit_wait: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            locator_probe: Duration::from_millis(30),
            scroll_settle: Duration::ZERO,
            presence_probe: Duration::from_millis(30),
            screenshot_dir: std::env::temp_dir(),
        },
        retry,
    )
}

fn quick_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1))
}

#[test]
fn test_search_box_found_by_fallback_and_text_replaced() {
    let browser = FakeBrowser::new();
    let input = LocatorStrategy::css("input[type='search']");
    browser.add(FakeElement::new("search", input.clone()).with_value("old text"));

    let target = Target::new("search box", LocatorStrategy::css("#search-v1")).or(input.clone());
    let base = page(&browser, quick_retry(3));

    base.input_text(&target, "zelda", true).unwrap();

    assert_eq!(base.value_of(&target, None).unwrap(), "zelda");
    let log = browser.find_log();
    let first_b = log.iter().position(|s| *s == input).unwrap();
    assert!(log[..first_b].iter().all(|s| s.value() == "#search-v1"));
    assert!(first_b > 0);
}

#[test]
fn test_priority_wins_over_document_order() {
    let browser = FakeBrowser::new();
    // the lower priority element comes first in the document
    browser.add(FakeElement::new("second-choice", LocatorStrategy::css(".card")).with_text("B"));
    browser.add(FakeElement::new("first-choice", LocatorStrategy::css("#hero")).with_text("A"));

    let target = Target::new("card", LocatorStrategy::css("#hero")).or(LocatorStrategy::css(".card"));
    let base = page(&browser, quick_retry(1));

    assert_eq!(base.text_of(&target, None).unwrap(), "A");
}

#[test]
fn test_malformed_candidate_is_skipped() {
    let browser = FakeBrowser::new();
    let bad = LocatorStrategy::xpath("//div[");
    browser.reject_selector(bad.clone());
    browser.add(FakeElement::new("ok", LocatorStrategy::css("#ok")).with_text("fine"));

    let target = Target::new("thing", bad).or(LocatorStrategy::css("#ok"));
    let base = page(&browser, quick_retry(1));

    assert_eq!(base.text_of(&target, None).unwrap(), "fine");
}

#[test]
fn test_not_found_lists_every_candidate() {
    let browser = FakeBrowser::new();
    let target = Target::new("ghost", LocatorStrategy::css("#a"))
        .or(LocatorStrategy::xpath("//b"))
        .or(LocatorStrategy::id("c"));
    let base = page(&browser, quick_retry(3));

    let start = Instant::now();
    let err = base.find(&target, None).unwrap_err();
    // three probes of 30ms, no retry of a missing element
    assert!(start.elapsed() < Duration::from_millis(200));
    match err {
        E2eError::ElementNotFound { target, attempted } => {
            assert_eq!(target, "ghost");
            assert_eq!(attempted, vec!["css='#a'", "xpath='//b'", "id='c'"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stale_reference_is_retried() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#title");
    browser.add(FakeElement::new("title", css.clone()).with_text("Live").stale_for(2));

    let base = page(&browser, quick_retry(3));
    assert_eq!(base.text_of(&Target::from(css), None).unwrap(), "Live");
}

#[test]
fn test_retry_gives_up_with_last_error() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#title");
    browser.add(FakeElement::new("title", css.clone()).with_text("Live").stale_for(5));

    let base = page(&browser, quick_retry(2));
    let err = base.text_of(&Target::from(css), None).unwrap_err();
    assert!(matches!(err, E2eError::StaleElement(_)));
}

#[test]
fn test_late_element_is_waited_for() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#late");
    browser.add(
        FakeElement::new("late", css.clone())
            .appears_after(3)
            .on_click(ClickEffect::Navigate("https://m.example.test/after".into())),
    );

    let base = page(&browser, quick_retry(1));
    base.click(&Target::from(css), None).unwrap();
    assert_eq!(browser.url(), "https://m.example.test/after");
}

#[test]
fn test_click_escalates_to_script() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#covered");
    browser.add(FakeElement::new("covered", css.clone()).obscured());

    let base = page(&browser, quick_retry(1));
    base.click(&Target::from(css), None).unwrap();

    assert_eq!(browser.element("covered").unwrap().clicks, vec![ClickTier::Script]);
    assert!(browser.scripts().iter().any(|s| s == scripts::CLICK));
}

#[test]
fn test_click_escalates_to_pointer() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#stubborn");
    browser.add(FakeElement::new("stubborn", css.clone()).failing_clicks(true, true, false));

    let base = page(&browser, quick_retry(1));
    base.click(&Target::from(css), None).unwrap();

    assert_eq!(browser.element("stubborn").unwrap().clicks, vec![ClickTier::Pointer]);
}

#[test]
fn test_click_fails_when_every_tier_fails() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#dead");
    browser.add(FakeElement::new("dead", css.clone()).failing_clicks(true, true, true));

    let base = page(&browser, quick_retry(3));
    let err = base.click(&Target::new("dead button", css), None).unwrap_err();

    match err {
        E2eError::ElementNotClickable { target, reason } => {
            assert_eq!(target, "dead button");
            assert!(reason.contains("native"));
            assert!(reason.contains("pointer"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(browser.element("dead").unwrap().clicks.is_empty());
}

#[test]
fn test_stubborn_field_cleared_by_script() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#q");
    browser.add(
        FakeElement::new("q", css.clone())
            .with_value("old")
            .clear_leaves("old"),
    );

    let base = page(&browser, quick_retry(1));
    base.input_text(&Target::from(css), "new", true).unwrap();

    assert_eq!(browser.element("q").unwrap().value, "new");
    assert!(browser.scripts().iter().any(|s| s == scripts::CLEAR_VALUE));
}

#[test]
fn test_disabled_field_is_not_usable() {
    let browser = FakeBrowser::new();
    let css = LocatorStrategy::css("#q");
    browser.add(FakeElement::new("q", css.clone()).disabled());

    let base = page(&browser, quick_retry(2));
    let err = base.input_text(&Target::from(css), "x", true).unwrap_err();
    assert!(matches!(err, E2eError::ElementNotClickable { .. }));
}

#[test]
fn test_popup_outcomes() {
    let browser = FakeBrowser::new();
    let base = page(&browser, quick_retry(1));
    let gate = Target::new("gate", LocatorStrategy::css("#gate"));

    assert_eq!(base.handle_popup(&gate, Duration::from_millis(20)), PopupOutcome::NotFound);

    browser.add(FakeElement::new("gate", LocatorStrategy::css("#gate")).on_click(ClickEffect::Remove));
    assert_eq!(base.handle_popup(&gate, Duration::from_millis(20)), PopupOutcome::Dismissed);
    assert_eq!(base.handle_popup(&gate, Duration::from_millis(20)), PopupOutcome::NotFound);

    browser.add(FakeElement::new("wall", LocatorStrategy::css("#wall")).failing_clicks(true, true, true));
    let wall = Target::new("wall", LocatorStrategy::css("#wall"));
    assert_eq!(base.handle_popup(&wall, Duration::from_millis(20)), PopupOutcome::Undismissed);
}

#[test]
fn test_wait_for_url() {
    let browser = FakeBrowser::new();
    browser.set_url("https://m.example.test/speedy/videos");
    let base = page(&browser, quick_retry(1));

    base.wait_for_url_contains("/videos", None).unwrap();
    let err = base
        .wait_for_url_contains("/never", Some(Duration::from_millis(20)))
        .unwrap_err();
    assert!(matches!(err, E2eError::Navigation(_)));
}

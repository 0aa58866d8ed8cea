use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use streamprobe_common::Target;
use tracing::{info, warn};

use super::target;
use crate::error::E2eResult;
use crate::page::{BasePage, PopupOutcome};

const OVERLAY_TIMEOUT: Duration = Duration::from_secs(3);

static COUNT_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)([0-9][0-9.,]*)\s*([KM])?").ok());

/// Parse a rendered viewer count such as `1,234`, `1.2K` or `3M viewers`
pub fn parse_viewer_count(text: &str) -> Option<u64> {
    let re = COUNT_RE.as_ref()?;
    let caps = re.captures(text.trim())?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    let num: f64 = digits.parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(unit) if unit == "K" => 1_000.0,
        Some(unit) if unit == "M" => 1_000_000.0,
        _ => 1.0,
    };
    Some((num * multiplier).round() as u64)
}

/// Channel page with the video player
pub struct StreamerPage<'a> {
    base: &'a BasePage,
}

impl<'a> StreamerPage<'a> {
    pub fn new(base: &'a BasePage) -> Self {
        Self { base }
    }

    pub fn video_player() -> Target {
        target("video player", &[".video-player__container", "video"], &[])
    }

    pub fn streamer_name_heading() -> Target {
        target(
            "streamer name",
            &[
                "h1[data-a-target='stream-title']",
                "[data-a-target='channel-header-display-name']",
            ],
            &["//h1"],
        )
    }

    pub fn mature_accept() -> Target {
        target(
            "mature content accept",
            &[
                "button[data-a-target='player-overlay-mature-accept']",
                "[data-a-target=\"player-overlay-mature-accept\"]",
                "button[data-a-target='content-classification-gate-overlay-start-watching-button']",
            ],
            &[],
        )
    }

    pub fn modal_close() -> Target {
        target(
            "modal close",
            &["button[data-a-target='modal-close-button']", "button[aria-label='Close']"],
            &[],
        )
    }

    pub fn viewer_count_label() -> Target {
        target(
            "viewer count",
            &[
                "div[data-a-target='viewers-count']",
                "[data-a-target='animated-channel-viewers-count']",
            ],
            &[],
        )
    }

    pub fn wait_for_player(&self, timeout: Option<Duration>) -> E2eResult<()> {
        info!("Waiting for video player");
        self.base.wait_visible(&Self::video_player(), timeout)?;
        Ok(())
    }

    pub fn dismiss_mature_content(&self) -> PopupOutcome {
        self.base.handle_popup(&Self::mature_accept(), OVERLAY_TIMEOUT)
    }

    pub fn close_modal(&self) -> PopupOutcome {
        self.base.handle_popup(&Self::modal_close(), OVERLAY_TIMEOUT)
    }

    pub fn streamer_name(&self) -> E2eResult<String> {
        let name = self.base.text_of(&Self::streamer_name_heading(), None)?;
        info!("Current streamer: {}", name);
        Ok(name)
    }

    /// Viewer count, `None` when the label cannot be parsed
    pub fn viewer_count(&self) -> E2eResult<Option<u64>> {
        let text = self.base.text_of(&Self::viewer_count_label(), None)?;
        let count = parse_viewer_count(&text);
        if count.is_none() {
            warn!("Could not parse viewer count: {}", text);
        }
        Ok(count)
    }

    /// Whether the browser is on a channel or its videos
    pub fn is_channel_page(&self) -> E2eResult<bool> {
        let url = self.base.current_url()?;
        Ok(url.contains("/videos") || url.contains("/channel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{ClickEffect, FakeBrowser, FakeElement};
    use crate::page::PageSettings;
    use crate::retry::RetryPolicy;
    use streamprobe_common::LocatorStrategy;
    use test_case::test_case;

    #[test_case("1,234", Some(1234))]
    #[test_case("1.2K", Some(1200))]
    #[test_case("3M viewers", Some(3_000_000))]
    #[test_case("987", Some(987))]
    #[test_case("15k", Some(15_000))]
    #[test_case("offline", None)]
    fn test_parse_viewer_count(text: &str, expected: Option<u64>) {
        assert_eq!(parse_viewer_count(text), expected);
    }

    fn base(browser: &FakeBrowser) -> BasePage {
        BasePage::new(
            Box::new(browser.clone()),
            PageSettings {
                base_url: "https://m.example.test".to_string(),
                explicit_wait: Duration::from_millis(100),
                poll_interval: Duration::from_millis(5),
                locator_probe: Duration::from_millis(20),
                scroll_settle: Duration::from_millis(1),
                presence_probe: Duration::from_millis(20),
                screenshot_dir: std::env::temp_dir(),
            },
            RetryPolicy::new(2, Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_channel_page_details() {
        let browser = FakeBrowser::new();
        browser.set_url("https://m.example.test/speedy/videos");
        browser.add(FakeElement::new("player", LocatorStrategy::css("video")));
        browser.add(
            FakeElement::new("name", LocatorStrategy::css("h1[data-a-target='stream-title']"))
                .with_text("Speedy"),
        );
        browser.add(
            FakeElement::new("viewers", LocatorStrategy::css("div[data-a-target='viewers-count']"))
                .with_text("2.5K"),
        );
        let base = base(&browser);
        let page = StreamerPage::new(&base);

        page.wait_for_player(None).unwrap();
        assert_eq!(page.streamer_name().unwrap(), "Speedy");
        assert_eq!(page.viewer_count().unwrap(), Some(2500));
        assert!(page.is_channel_page().unwrap());
    }

    #[test]
    fn test_mature_gate_dismissed_when_present() {
        let browser = FakeBrowser::new();
        let page_base = base(&browser);
        let page = StreamerPage::new(&page_base);
        assert_eq!(page.dismiss_mature_content(), PopupOutcome::NotFound);

        browser.add(
            FakeElement::new(
                "gate",
                LocatorStrategy::css("button[data-a-target='player-overlay-mature-accept']"),
            )
            .on_click(ClickEffect::Hide),
        );
        assert_eq!(page.dismiss_mature_content(), PopupOutcome::Dismissed);
        assert_eq!(page.close_modal(), PopupOutcome::NotFound);
    }
}

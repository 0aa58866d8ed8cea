use std::time::Duration;

use streamprobe_common::Target;
use tracing::info;

use super::{pick_index, target};
use crate::error::{E2eError, E2eResult};
use crate::page::{BasePage, PopupOutcome};
use crate::scripts;

const CONSENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Landing page
pub struct HomePage<'a> {
    base: &'a BasePage,
}

impl<'a> HomePage<'a> {
    pub fn new(base: &'a BasePage) -> Self {
        Self { base }
    }

    pub fn search_button() -> Target {
        target(
            "search button",
            &[
                "button[data-a-target='header-search-button']",
                "[data-a-target=\"search-button\"]",
            ],
            &["//button[@aria-label='Search']"],
        )
    }

    pub fn browse_link() -> Target {
        target(
            "browse link",
            &["a[data-a-target='browse-link']"],
            &["//a[contains(@href, '/directory')]"],
        )
    }

    pub fn cookie_consent() -> Target {
        target(
            "cookie consent",
            &["button[data-a-target='consent-banner-accept']"],
            &["//button[contains(., 'Accept')]"],
        )
    }

    pub fn featured_stream() -> Target {
        target(
            "featured stream",
            &[
                "div[data-test-selector='recommended-channel']",
                "[data-a-target='preview-card-image-link']",
            ],
            &[],
        )
    }

    /// Load the base URL and clear the consent banner
    pub fn open(&self) -> E2eResult<()> {
        info!("Navigating to home page");
        self.base.open(&self.base.settings().base_url)?;
        self.accept_cookies();
        Ok(())
    }

    /// Accept cookies if asked. Falls back to a script click when the banner
    /// resists or hides behind another layer.
    pub fn accept_cookies(&self) -> bool {
        match self.base.handle_popup(&Self::cookie_consent(), CONSENT_TIMEOUT) {
            PopupOutcome::Dismissed => true,
            outcome => {
                let clicked = self
                    .base
                    .session()
                    .execute_script(scripts::ACCEPT_CONSENT, &[])
                    .map(|v| v.as_bool().unwrap_or(false))
                    .unwrap_or(false);
                if clicked {
                    info!("Cookie consent accepted by script after {:?}", outcome);
                } else {
                    info!("No cookie consent banner detected");
                }
                clicked
            }
        }
    }

    pub fn open_search(&self) -> E2eResult<()> {
        info!("Opening search");
        self.base.click(&Self::search_button(), None)
    }

    pub fn browse(&self) -> E2eResult<()> {
        info!("Opening browse");
        self.base.click(&Self::browse_link(), None)
    }

    /// Number of recommended channels on the page
    pub fn featured_streams(&self) -> E2eResult<usize> {
        Ok(self.base.find_all(&Self::featured_stream(), None)?.len())
    }

    /// Open a recommended channel, the first one when `index` is out of range
    pub fn open_featured_stream(&self, index: usize) -> E2eResult<usize> {
        let featured = Self::featured_stream();
        self.base.retry_policy().run("open featured stream", || {
            let streams = self.base.find_all_once(&featured, None)?;
            let idx = pick_index(streams.len(), index, "featured stream")
                .ok_or_else(|| E2eError::EmptyResults("featured streams".to_string()))?;
            self.base.scroll_element_into_view(&streams[idx])?;
            self.base.click_element(&featured, &streams[idx])?;
            Ok(idx)
        })
    }
}

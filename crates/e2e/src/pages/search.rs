use std::time::Duration;

use streamprobe_common::Target;
use tracing::{debug, info};

use super::{pick_index, target};
use crate::error::{E2eError, E2eResult};
use crate::page::BasePage;

/// WebDriver key code for Enter
const ENTER: &str = "\u{E007}";

const RESULTS_TIMEOUT: Duration = Duration::from_secs(3);

/// Search overlay and results list
pub struct SearchPage<'a> {
    base: &'a BasePage,
}

impl<'a> SearchPage<'a> {
    pub fn new(base: &'a BasePage) -> Self {
        Self { base }
    }

    pub fn search_input() -> Target {
        target(
            "search input",
            &[
                "input[data-a-target='tw-input']",
                "[data-a-target=\"search-input\"]",
                "input[type='search']",
            ],
            &[],
        )
    }

    pub fn submit_button() -> Target {
        target(
            "search submit",
            &["button[data-a-target='search-submit-button']"],
            &[],
        )
    }

    pub fn result_card() -> Target {
        target(
            "search result",
            &[
                "div[data-a-target='search-result-card']",
                "[data-a-target='search-result-card']",
            ],
            &[],
        )
    }

    pub fn streamer_card() -> Target {
        target(
            "streamer card",
            &[
                "a[data-a-target='search-result-card-link']",
                "[data-a-target=\"preview-card-title-link\"]",
            ],
            &["//a[contains(@href, '/videos')]"],
        )
    }

    pub fn no_results() -> Target {
        target(
            "no results message",
            &[".tw-align-items-center.tw-flex.tw-flex-col"],
            &["//*[contains(text(), 'No results')]"],
        )
    }

    pub fn channels_tab_button() -> Target {
        target("channels tab", &["button[data-a-target='search-tab-CHANNEL']"], &[])
    }

    pub fn categories_tab_button() -> Target {
        target("categories tab", &["button[data-a-target='search-tab-CATEGORY']"], &[])
    }

    /// Type `query` and submit it, pressing Enter when there is no submit button
    pub fn search_for(&self, query: &str) -> E2eResult<()> {
        info!("Searching for: {}", query);
        self.base.input_text(&Self::search_input(), query, true)?;
        if self.base.is_present(&Self::submit_button()) {
            self.base.click(&Self::submit_button(), None)
        } else {
            debug!("No submit button, pressing Enter");
            self.base.input_text(&Self::search_input(), ENTER, false)
        }
    }

    pub fn result_count(&self) -> E2eResult<usize> {
        let count = self
            .base
            .find_all(&Self::result_card(), Some(RESULTS_TIMEOUT))?
            .len();
        info!("Search returned {} result(s)", count);
        Ok(count)
    }

    pub fn has_no_results(&self) -> bool {
        self.base.is_present(&Self::no_results())
    }

    /// Open a streamer from the results, the first one when `index` is out
    /// of range. Returns the index actually opened.
    pub fn select_streamer(&self, index: usize) -> E2eResult<usize> {
        let cards = Self::streamer_card();
        self.base.retry_policy().run("select streamer", || {
            let streamers = self.base.find_all_once(&cards, None)?;
            let idx = pick_index(streamers.len(), index, "streamer")
                .ok_or_else(|| E2eError::EmptyResults("streamers in search results".to_string()))?;
            info!("Selecting streamer at index {}", idx);
            self.base.scroll_element_into_view(&streamers[idx])?;
            self.base.click_element(&cards, &streamers[idx])?;
            Ok(idx)
        })
    }

    pub fn channels_tab(&self) -> E2eResult<()> {
        info!("Switching to Channels tab");
        self.base.click(&Self::channels_tab_button(), None)
    }

    pub fn categories_tab(&self) -> E2eResult<()> {
        info!("Switching to Categories tab");
        self.base.click(&Self::categories_tab_button(), None)
    }
}

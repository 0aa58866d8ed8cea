//! StreamProbe browser interaction core
//!
//! Drives a mobile-emulated browser through a small capability trait and
//! keeps flaky UIs from failing runs for the wrong reasons:
//! - Targets carry ordered fallback locators, tried by priority
//! - Every wait is a bounded poll against a [`wait::Condition`]
//! - Transient failures are retried by a [`retry::RetryPolicy`]
//! - Clicks escalate native -> script -> pointer before giving up
//! - Screenshots of each step are assembled into an animated GIF
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ScenarioRunner                                              │
//! │    └── HomePage / SearchPage / StreamerPage                 │
//! │          └── BasePage (click, input_text, scroll, popups)   │
//! │                ├── LocatorResolver (fallback resolution)    │
//! │                ├── wait (poll_until, Condition)             │
//! │                ├── RetryPolicy                              │
//! │                └── dyn BrowserSession                       │
//! │                      ├── WebDriverSession (HTTP)            │
//! │                      └── FakeBrowser (in-memory)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  artifact: ScreenshotSequence, GifAssembler                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod error;
pub mod fake;
pub mod locator;
pub mod page;
pub mod pages;
pub mod retry;
pub mod runner;
pub mod scripts;
pub mod session;
pub mod wait;
pub mod webdriver;

pub use artifact::{GifArtifact, GifAssembler, ScreenshotArtifact, ScreenshotSequence};
pub use error::{E2eError, E2eResult, ErrorKind};
pub use locator::{LocatorResolver, Resolved};
pub use page::{BasePage, PageSettings, PopupOutcome};
pub use retry::RetryPolicy;
pub use runner::{ScenarioResult, ScenarioRunner, SearchScenario, SuiteResult};
pub use session::{BrowserSession, ElementHandle};
pub use wait::{Condition, WaitSpec};
pub use webdriver::{Capabilities, WebDriverSession};

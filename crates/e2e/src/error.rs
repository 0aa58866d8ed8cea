//! Error types for browser interaction

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Element '{target}' not found, tried: {}", .attempted.join(", "))]
    ElementNotFound {
        target: String,
        attempted: Vec<String>,
    },

    #[error("Element '{target}' not clickable: {reason}")]
    ElementNotClickable { target: String, reason: String },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No frames found in {}", .0.display())]
    NoFrames(PathBuf),

    #[error("Screenshot sequence in {} is full ({max} frames)", .dir.display())]
    SequenceFull { dir: PathBuf, max: u32 },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No results for: {0}")]
    EmptyResults(String),

    #[error("WebDriver error [{code}]: {message}")]
    WebDriver { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] streamprobe_common::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Error classification used by retry policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotClickable,
    Navigation,
    NoFrames,
    Timeout,
    StaleElement,
    InvalidSelector,
    EmptyResults,
    WebDriver,
    Transport,
    Io,
    Encoding,
    Config,
}

impl E2eError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            E2eError::ElementNotFound { .. } => ErrorKind::NotFound,
            E2eError::ElementNotClickable { .. } => ErrorKind::NotClickable,
            E2eError::Navigation(_) => ErrorKind::Navigation,
            E2eError::NoFrames(_) => ErrorKind::NoFrames,
            E2eError::Timeout(_) => ErrorKind::Timeout,
            E2eError::StaleElement(_) => ErrorKind::StaleElement,
            E2eError::InvalidSelector(_) => ErrorKind::InvalidSelector,
            E2eError::EmptyResults(_) => ErrorKind::EmptyResults,
            E2eError::WebDriver { .. } => ErrorKind::WebDriver,
            E2eError::Http(_) => ErrorKind::Transport,
            E2eError::Io(_) | E2eError::SequenceFull { .. } => ErrorKind::Io,
            E2eError::Json(_) | E2eError::Image(_) | E2eError::Base64(_) => ErrorKind::Encoding,
            E2eError::Config(_) => ErrorKind::Config,
        }
    }

    /// Timeouts and stale references may clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::StaleElement)
    }

    pub(crate) fn webdriver(code: impl Into<String>, message: impl Into<String>) -> Self {
        E2eError::WebDriver {
            code: code.into(),
            message: message.into(),
        }
    }
}

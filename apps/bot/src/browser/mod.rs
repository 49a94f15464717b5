//! Browser Driver — the capability the automation core drives.
//!
//! The core never talks to a browser directly. Everything goes through
//! `BrowserDriver`, which the WebDriver client implements for real runs
//! and a scripted fake implements in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, Instant};

pub mod webdriver;

#[cfg(test)]
pub mod testing;

pub use webdriver::WebDriverSession;

/// Interval between element polls while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// How to find an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    /// W3C WebDriver location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            Locator::Css(v) | Locator::XPath(v) => v,
        }
    }
}

/// Opaque reference to an element in the current browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The element exists in the DOM.
    Present,
    /// The element exists, is displayed and is enabled.
    Clickable,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Stale element reference")]
    StaleElement,

    #[error("Browser session could not be started: {0}")]
    SessionStart(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },
}

impl DriverError {
    /// True when the error only means "the element is not there (yet)".
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. } | DriverError::NoSuchElement(_)
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait
// ────────────────────────────────────────────────────────────────────────────

/// A single browser session. Calls are strictly sequential; the session is
/// never shared between concurrent callers.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Finds the first element matching `locator`, without waiting.
    async fn find(&self, locator: Locator) -> Result<ElementHandle, DriverError>;

    async fn find_all(&self, locator: Locator) -> Result<Vec<ElementHandle>, DriverError>;

    /// Finds all elements matching `locator` below `parent`.
    async fn find_in(
        &self,
        parent: &ElementHandle,
        locator: Locator,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Switches the browsing context into the given iframe element.
    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), DriverError>;

    /// Switches back to the top-level browsing context.
    async fn leave_frames(&self) -> Result<(), DriverError>;

    /// Ends the browser session.
    async fn quit(&self) -> Result<(), DriverError>;

    /// Supplies a local file to a file input.
    async fn upload(&self, input: &ElementHandle, path: &Path) -> Result<(), DriverError> {
        self.send_keys(input, &path.to_string_lossy()).await
    }

    /// Polls for `locator` until it satisfies `condition` or `timeout` elapses.
    async fn wait_for(
        &self,
        locator: Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => {
                    if condition == WaitCondition::Present || self.is_clickable(&element).await? {
                        return Ok(element);
                    }
                }
                Err(e) if e.is_absence() => {}
                Err(DriverError::StaleElement) => {}
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    locator: locator.value().to_string(),
                    waited: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Displayed and enabled. A stale reference counts as not clickable.
    async fn is_clickable(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let displayed = match self.is_displayed(element).await {
            Ok(d) => d,
            Err(DriverError::StaleElement) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !displayed {
            return Ok(false);
        }
        match self.is_enabled(element).await {
            Ok(enabled) => Ok(enabled),
            Err(DriverError::StaleElement) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

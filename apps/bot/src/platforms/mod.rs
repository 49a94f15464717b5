//! Job Platforms — one capability interface, one implementation per site.
//!
//! The orchestrator only sees `JobPlatform`. `BrowserPlatform` implements it
//! for any site described by a `PlatformProfile`; the per-site modules hold
//! nothing but those profiles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::automation::extractor::{self, ExtractionError, PostingSelectors};
use crate::automation::field_filler::FieldFiller;
use crate::automation::form_walker::{
    ApplyContext, FormOutcome, FormSelectors, FormSettings, FormWalker,
};
use crate::automation::pacing::PacingPolicy;
use crate::browser::{BrowserDriver, DriverError, ElementHandle, Locator, WaitCondition};
use crate::config::Credentials;
use crate::models::Posting;

pub mod indeed;
pub mod linkedin;

const COOKIE_BANNER_WAIT: Duration = Duration::from_secs(3);
const LOGIN_FIELD_WAIT: Duration = Duration::from_secs(10);
const LOGIN_CONFIRM_WAIT: Duration = Duration::from_secs(20);
const POSTING_WAIT: Duration = Duration::from_secs(10);
const APPLY_CONTROL_WAIT: Duration = Duration::from_secs(5);
/// Upper bound on infinite-scroll rounds per search page.
const MAX_SCROLL_ROUNDS: u32 = 10;

const SCROLL_SCRIPT: &str =
    "window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight;";

// ────────────────────────────────────────────────────────────────────────────
// Capability interface
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Browser error: {0}")]
    Driver(#[from] DriverError),

    #[error("Could not build search URL: {0}")]
    SearchUrl(String),
}

/// What came of trying to apply to one posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The apply flow ran to a terminal state.
    Completed(FormOutcome),
    /// The posting has no in-site apply control.
    Unavailable,
}

#[async_trait]
pub trait JobPlatform: Send + Sync {
    /// Platform name as stored in the ledger.
    fn name(&self) -> &str;

    async fn login(&self, credentials: &Credentials) -> Result<(), PlatformError>;

    /// Handles to the posting cards of one search.
    async fn search(
        &self,
        keyword: &str,
        location: &str,
    ) -> Result<Vec<ElementHandle>, PlatformError>;

    async fn extract_posting(&self, card: &ElementHandle) -> Result<Posting, ExtractionError>;

    /// Applies to the posting currently in focus.
    async fn apply(&self, ctx: &ApplyContext<'_>) -> Result<ApplyOutcome, PlatformError>;

    /// Releases the browser. Never fails.
    async fn close(&self);
}

// ────────────────────────────────────────────────────────────────────────────
// Site profiles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct SearchUrl {
    pub base: &'static str,
    pub keyword_param: &'static str,
    pub location_param: &'static str,
    /// Fixed filters, e.g. "in-site apply only".
    pub extra: &'static [(&'static str, &'static str)],
}

impl SearchUrl {
    pub fn build(&self, keyword: &str, location: &str) -> Result<String, PlatformError> {
        let params = [(self.keyword_param, keyword), (self.location_param, location)]
            .into_iter()
            .chain(self.extra.iter().copied());
        Url::parse_with_params(self.base, params)
            .map(String::from)
            .map_err(|e| PlatformError::SearchUrl(e.to_string()))
    }
}

/// Everything site-specific about driving a job board.
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    pub name: &'static str,
    pub login_url: &'static str,
    pub cookie_accept: Option<Locator>,
    pub username_field: Locator,
    /// Clicked between username and password on two-step logins.
    pub login_continue: Option<Locator>,
    pub password_field: Locator,
    pub login_submit: Locator,
    /// Present only once logged in.
    pub logged_in_marker: Locator,
    pub search: SearchUrl,
    pub posting_card: Locator,
    pub posting: PostingSelectors,
    pub apply_button: Locator,
    /// Set when the apply flow is rendered inside an iframe.
    pub apply_frame: Option<Locator>,
    pub form: FormSelectors,
}

/// Built-in profile for a configured platform name.
pub fn profile_for(name: &str) -> Option<&'static PlatformProfile> {
    match name.trim().to_ascii_lowercase().as_str() {
        "linkedin" => Some(&linkedin::PROFILE),
        "indeed" => Some(&indeed::PROFILE),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// BrowserPlatform
// ────────────────────────────────────────────────────────────────────────────

pub struct BrowserPlatform {
    driver: Arc<dyn BrowserDriver>,
    profile: &'static PlatformProfile,
    pacing: PacingPolicy,
    filler: Arc<dyn FieldFiller>,
    form_settings: FormSettings,
}

impl BrowserPlatform {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        profile: &'static PlatformProfile,
        pacing: PacingPolicy,
        filler: Arc<dyn FieldFiller>,
        form_settings: FormSettings,
    ) -> Self {
        Self {
            driver,
            profile,
            pacing,
            filler,
            form_settings,
        }
    }

    async fn accept_cookies(&self) {
        let Some(accept) = self.profile.cookie_accept else {
            return;
        };
        match self
            .driver
            .wait_for(accept, WaitCondition::Clickable, COOKIE_BANNER_WAIT)
            .await
        {
            Ok(button) => {
                if let Err(e) = self.driver.click(&button).await {
                    debug!("Cookie banner click failed: {e}");
                }
            }
            Err(e) => debug!("No cookie banner: {e}"),
        }
    }

    /// Waits for a login form element; absence means the login page is not what we expect.
    async fn login_element(&self, locator: Locator) -> Result<ElementHandle, PlatformError> {
        self.driver
            .wait_for(locator, WaitCondition::Clickable, LOGIN_FIELD_WAIT)
            .await
            .map_err(|e| match e {
                e if e.is_absence() => {
                    PlatformError::Authentication(format!("login form element missing: {e}"))
                }
                e => PlatformError::Driver(e),
            })
    }

    async fn scroll_to_end(&self) -> Result<(), PlatformError> {
        let mut last_height = None;
        for _ in 0..MAX_SCROLL_ROUNDS {
            let height = self.driver.execute_script(SCROLL_SCRIPT).await?.as_i64();
            if height.is_some() && height == last_height {
                break;
            }
            last_height = height;
            self.pacing.short().await;
        }
        Ok(())
    }

    /// Clicks the apply control and enters the apply frame when the profile has one.
    /// Returns whether a frame was entered.
    async fn open_apply_flow(&self, button: &ElementHandle) -> Result<bool, DriverError> {
        self.driver.click(button).await?;
        self.pacing.short().await;

        let Some(frame) = self.profile.apply_frame else {
            return Ok(false);
        };
        match self
            .driver
            .wait_for(frame, WaitCondition::Present, APPLY_CONTROL_WAIT)
            .await
        {
            Ok(frame) => {
                self.driver.enter_frame(&frame).await?;
                Ok(true)
            }
            Err(e) if e.is_absence() => {
                debug!("Apply flow is not framed this time");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl JobPlatform for BrowserPlatform {
    fn name(&self) -> &str {
        self.profile.name
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), PlatformError> {
        info!("Logging in to {} as {}", self.profile.name, credentials.username);
        self.driver.navigate(self.profile.login_url).await?;
        self.pacing.short().await;
        self.accept_cookies().await;

        let username = self.login_element(self.profile.username_field).await?;
        self.driver
            .send_keys(&username, &credentials.username)
            .await?;

        if let Some(next) = self.profile.login_continue {
            let next = self.login_element(next).await?;
            self.driver.click(&next).await?;
            self.pacing.short().await;
        }

        let password = self.login_element(self.profile.password_field).await?;
        self.driver
            .send_keys(&password, &credentials.password)
            .await?;
        let submit = self.login_element(self.profile.login_submit).await?;
        self.driver.click(&submit).await?;

        match self
            .driver
            .wait_for(
                self.profile.logged_in_marker,
                WaitCondition::Present,
                LOGIN_CONFIRM_WAIT,
            )
            .await
        {
            Ok(_) => {
                info!("Logged in to {}", self.profile.name);
                Ok(())
            }
            Err(e) if e.is_absence() => Err(PlatformError::Authentication(
                "post-login page did not appear; check credentials or a verification challenge"
                    .to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn search(
        &self,
        keyword: &str,
        location: &str,
    ) -> Result<Vec<ElementHandle>, PlatformError> {
        let url = self.profile.search.build(keyword, location)?;
        info!("Searching {} for '{keyword}' in '{location}'", self.profile.name);
        self.driver.navigate(&url).await?;
        self.pacing.short().await;
        self.scroll_to_end().await?;

        let cards = self.driver.find_all(self.profile.posting_card).await?;
        info!("Found {} posting(s) for '{keyword}' in '{location}'", cards.len());
        Ok(cards)
    }

    async fn extract_posting(&self, card: &ElementHandle) -> Result<Posting, ExtractionError> {
        extractor::extract(
            self.driver.as_ref(),
            &self.profile.posting,
            card,
            POSTING_WAIT,
        )
        .await
    }

    async fn apply(&self, ctx: &ApplyContext<'_>) -> Result<ApplyOutcome, PlatformError> {
        let button = match self
            .driver
            .wait_for(
                self.profile.apply_button,
                WaitCondition::Clickable,
                APPLY_CONTROL_WAIT,
            )
            .await
        {
            Ok(button) => button,
            Err(e) if e.is_absence() => return Ok(ApplyOutcome::Unavailable),
            Err(e) => return Err(e.into()),
        };

        let walker = FormWalker::new(
            self.driver.as_ref(),
            &self.profile.form,
            self.filler.as_ref(),
            &self.pacing,
            self.form_settings,
        );

        // From the click on, a flow may be open and must be abandoned on failure.
        let in_frame = match self.open_apply_flow(&button).await {
            Ok(in_frame) => in_frame,
            Err(e) => {
                warn!(
                    "Apply flow for {} at {} ({}) could not be opened: {e}",
                    ctx.posting.title, ctx.posting.company, ctx.posting.url
                );
                walker.cancel().await;
                if let Err(leave) = self.driver.leave_frames().await {
                    warn!("Could not leave apply frame: {leave}");
                }
                return Ok(ApplyOutcome::Completed(FormOutcome::Dismissed(e.to_string())));
            }
        };

        let outcome = walker.walk(ctx).await;

        if in_frame {
            if let Err(e) = self.driver.leave_frames().await {
                warn!("Could not leave apply frame: {e}");
            }
        }
        Ok(ApplyOutcome::Completed(outcome))
    }

    async fn close(&self) {
        match self.driver.quit().await {
            Ok(()) => info!("Browser session for {} closed", self.profile.name),
            Err(e) => warn!("Browser session for {} did not close cleanly: {e}", self.profile.name),
        }
    }
}

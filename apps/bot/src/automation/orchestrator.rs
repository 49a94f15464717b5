//! Session Orchestrator — one complete bot run.
//!
//! login → reconcile today's count from the ledger → for each (location, keyword):
//! search → per posting: dedupe, cover letter, apply, record, pace.
//!
//! Only startup problems (resume, ledger, browser, login) abort a run. Anything
//! that goes wrong with a single posting is logged and the run moves on. The
//! browser and the ledger are released on every exit path.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::automation::cover_letter::CoverLetterGenerator;
use crate::automation::field_filler::StandardFieldFiller;
use crate::automation::form_walker::ApplyContext;
use crate::automation::ledger::{Ledger, LedgerError};
use crate::automation::pacing::PacingPolicy;
use crate::automation::resume::{load_resume, ResumeDocument, ResumeError};
use crate::browser::{DriverError, ElementHandle, WebDriverSession};
use crate::config::{BotConfig, Config, Credentials};
use crate::llm_client::LanguageModel;
use crate::models::{ApplicationStatus, Posting};
use crate::platforms::{profile_for, ApplyOutcome, BrowserPlatform, JobPlatform, PlatformError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Unsupported platform '{0}'")]
    UnknownPlatform(String),

    #[error("Resume unavailable: {0}")]
    Resume(#[from] ResumeError),

    #[error("Ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Browser could not be started: {0}")]
    BrowserStart(DriverError),

    #[error("Login failed: {0}")]
    Authentication(PlatformError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every (location, keyword) combination was searched.
    Exhausted,
    CapReached,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::CapReached => "cap_reached",
            StopReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub applied: u32,
    pub failed: u32,
    pub skipped: u32,
    pub stop_reason: StopReason,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} applied, {} failed, {} skipped",
            self.stop_reason.as_str(),
            self.applied,
            self.failed,
            self.skipped
        )
    }
}

/// Per-run bookkeeping.
#[derive(Debug)]
pub struct SessionState {
    pub applications_today: u32,
    pub max_applications: u32,
    visited: HashSet<String>,
}

impl SessionState {
    pub fn new(applications_today: u32, max_applications: u32) -> Self {
        Self {
            applications_today,
            max_applications,
            visited: HashSet::new(),
        }
    }

    pub fn cap_reached(&self) -> bool {
        self.applications_today >= self.max_applications
    }

    /// False if the posting was already seen this run.
    pub fn mark_visited(&mut self, external_id: &str) -> bool {
        self.visited.insert(external_id.to_string())
    }
}

/// What to search for and as whom.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub credentials: Credentials,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    pub max_applications: u32,
}

#[derive(Debug, Default)]
struct Tally {
    applied: u32,
    failed: u32,
    skipped: u32,
}

impl Tally {
    fn finish(self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            applied: self.applied,
            failed: self.failed,
            skipped: self.skipped,
            stop_reason,
        }
    }
}

pub struct Orchestrator {
    platform: Arc<dyn JobPlatform>,
    ledger: Ledger,
    generator: CoverLetterGenerator,
    pacing: PacingPolicy,
    resume: ResumeDocument,
    plan: SessionPlan,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        platform: Arc<dyn JobPlatform>,
        ledger: Ledger,
        generator: CoverLetterGenerator,
        pacing: PacingPolicy,
        resume: ResumeDocument,
        plan: SessionPlan,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            platform,
            ledger,
            generator,
            pacing,
            resume,
            plan,
            cancel,
        }
    }

    /// Drives the run to completion, then releases the browser and the ledger
    /// whatever the result.
    pub async fn run(self) -> Result<RunSummary, RunError> {
        let result = self.drive().await;

        self.platform.close().await;
        self.ledger.close().await;

        match &result {
            Ok(summary) => info!("Run finished ({summary})"),
            Err(e) => error!("Run aborted: {e}"),
        }
        result
    }

    async fn drive(&self) -> Result<RunSummary, RunError> {
        let platform = self.platform.name().to_string();

        self.platform
            .login(&self.plan.credentials)
            .await
            .map_err(RunError::Authentication)?;

        let already = self.ledger.count_today(&platform).await?;
        let mut state = SessionState::new(already, self.plan.max_applications);
        info!(
            "{already} application(s) already sent on {platform} today (cap {})",
            state.max_applications
        );

        let mut tally = Tally::default();
        for location in &self.plan.locations {
            for keyword in &self.plan.keywords {
                if let Some(reason) = self.stop_reason(&state) {
                    return Ok(tally.finish(reason));
                }

                let cards = match self.platform.search(keyword, location).await {
                    Ok(cards) => cards,
                    Err(e) => {
                        warn!("Search for '{keyword}' in '{location}' on {platform} failed: {e}");
                        continue;
                    }
                };

                for card in &cards {
                    if let Some(reason) = self.stop_reason(&state) {
                        return Ok(tally.finish(reason));
                    }
                    self.process(&platform, card, &mut state, &mut tally).await;
                }
            }
        }

        Ok(tally.finish(StopReason::Exhausted))
    }

    fn stop_reason(&self, state: &SessionState) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            info!("Run cancelled");
            return Some(StopReason::Cancelled);
        }
        if state.cap_reached() {
            info!(
                "Daily cap of {} application(s) reached",
                state.max_applications
            );
            return Some(StopReason::CapReached);
        }
        None
    }

    async fn process(
        &self,
        platform: &str,
        card: &ElementHandle,
        state: &mut SessionState,
        tally: &mut Tally,
    ) {
        let posting = match self.platform.extract_posting(card).await {
            Ok(posting) => posting,
            Err(e) => {
                warn!("Skipping unreadable posting on {platform}: {e}");
                return;
            }
        };

        if !state.mark_visited(&posting.external_id) {
            debug!("Already visited {} this run", posting.url);
            return;
        }

        match self.ledger.has_applied(platform, &posting.url).await {
            Ok(false) => {}
            Ok(true) => {
                info!(
                    "Already applied to {} at {} ({})",
                    posting.title, posting.company, posting.url
                );
                return;
            }
            Err(e) => {
                warn!(
                    "Could not check ledger for {} at {} ({}); skipping: {e}",
                    posting.title, posting.company, posting.url
                );
                return;
            }
        }

        info!("Applying to {} at {}", posting.title, posting.company);
        let cover_letter = match self.generator.generate(&posting, &self.resume.text).await {
            Ok(letter) => letter,
            Err(e) => {
                warn!(
                    "No cover letter for {} at {}, applying without: {e}",
                    posting.title, posting.company
                );
                String::new()
            }
        };

        let ctx = ApplyContext {
            posting: &posting,
            resume: &self.resume,
            cover_letter: &cover_letter,
        };
        let (status, notes) = match self.platform.apply(&ctx).await {
            Ok(ApplyOutcome::Completed(outcome)) if outcome.is_submitted() => {
                (ApplicationStatus::Applied, None)
            }
            Ok(ApplyOutcome::Completed(outcome)) => (ApplicationStatus::Failed, outcome.notes()),
            Ok(ApplyOutcome::Unavailable) => (
                ApplicationStatus::Skipped,
                Some("no in-site apply option".to_string()),
            ),
            Err(e) => (ApplicationStatus::Failed, Some(format!("platform error: {e}"))),
        };

        match status {
            ApplicationStatus::Applied => tally.applied += 1,
            ApplicationStatus::Failed => {
                warn!(
                    "Application to {} at {} on {platform} failed ({}): {}",
                    posting.title,
                    posting.company,
                    posting.url,
                    notes.as_deref().unwrap_or("unknown")
                );
                tally.failed += 1;
            }
            ApplicationStatus::Skipped => tally.skipped += 1,
        }

        self.record(platform, &posting, status, notes.as_deref(), state)
            .await;

        if status == ApplicationStatus::Applied {
            self.pacing.long().await;
        }
    }

    async fn record(
        &self,
        platform: &str,
        posting: &Posting,
        status: ApplicationStatus,
        notes: Option<&str>,
        state: &mut SessionState,
    ) {
        match self.ledger.record(platform, posting, status, notes).await {
            Ok(_) => {
                if status == ApplicationStatus::Applied {
                    state.applications_today += 1;
                    info!(
                        "Applied to {} at {} ({}/{} today)",
                        posting.title,
                        posting.company,
                        state.applications_today,
                        state.max_applications
                    );
                }
            }
            Err(e) => error!(
                "Could not record {status} for {} at {} on {platform} ({}): {e}",
                posting.title, posting.company, posting.url
            ),
        }
    }
}

/// Starts and drives one run. The HTTP surface only knows this seam.
#[async_trait]
pub trait BotRunner: Send + Sync {
    async fn run(
        &self,
        bot: BotConfig,
        credentials: Credentials,
        cancel: CancellationToken,
    ) -> Result<RunSummary, RunError>;
}

/// Wires a real WebDriver session, the ledger and the language model.
pub struct BrowserRunner {
    config: Config,
    llm: Arc<dyn LanguageModel>,
}

impl BrowserRunner {
    pub fn new(config: Config, llm: Arc<dyn LanguageModel>) -> Self {
        Self { config, llm }
    }
}

#[async_trait]
impl BotRunner for BrowserRunner {
    async fn run(
        &self,
        bot: BotConfig,
        credentials: Credentials,
        cancel: CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let profile = profile_for(&bot.platform.name)
            .ok_or_else(|| RunError::UnknownPlatform(bot.platform.name.clone()))?;
        let resume = load_resume(&bot.resume_path).await?;
        let ledger = Ledger::open(&self.config.database_url).await?;

        let driver =
            match WebDriverSession::start(&self.config.webdriver_url, self.config.headless).await {
                Ok(driver) => Arc::new(driver),
                Err(e) => {
                    ledger.close().await;
                    return Err(RunError::BrowserStart(e));
                }
            };

        let generator = CoverLetterGenerator::new(self.llm.clone());
        let pacing = PacingPolicy::new(bot.settings.pacing);
        let filler = StandardFieldFiller::new(
            bot.settings.answers.clone(),
            bot.settings.llm_answers.then(|| generator.clone()),
        );
        let platform = BrowserPlatform::new(
            driver,
            profile,
            pacing,
            Arc::new(filler),
            bot.settings.form,
        );
        let plan = SessionPlan {
            credentials,
            keywords: bot.keywords(),
            locations: bot.locations(),
            max_applications: bot.settings.max_applications_per_day,
        };

        Orchestrator::new(
            Arc::new(platform),
            ledger,
            generator,
            pacing,
            resume,
            plan,
            cancel,
        )
        .run()
        .await
    }
}

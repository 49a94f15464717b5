//! Form Walker — drives a multi-page apply flow to a terminal outcome.
//!
//! State machine:
//!
//! ```text
//! AwaitingStep ──step()──► Continue ──► AwaitingStep
//!                     ├──► Submitted            (success)
//!                     ├──► Dismissed(reason)    (driver error, form closed)
//!                     └──► Blocked(reason)      (unfillable field, no control, step limit)
//! ```
//!
//! Per step: optional resume upload, field filling, then "next" if clickable,
//! else "submit" if clickable, else blocked. Every non-submitted outcome is
//! followed by a best-effort cancel so the browser is never left mid-form.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::automation::field_filler::{FieldFiller, FillError};
use crate::automation::pacing::PacingPolicy;
use crate::automation::resume::ResumeDocument;
use crate::browser::{BrowserDriver, DriverError, ElementHandle, Locator, WaitCondition};
use crate::models::Posting;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Where a platform's apply dialog puts its controls.
#[derive(Debug, Clone, Copy)]
pub struct FormSelectors {
    /// Container of the apply flow; its disappearance means the site closed the form.
    pub modal: Locator,
    pub file_input: Locator,
    pub next_button: Locator,
    pub submit_button: Locator,
    /// Close button of the "application sent" dialog.
    pub confirmation_dismiss: Locator,
    pub cancel_button: Locator,
    /// "Discard" in the save-or-discard prompt shown after cancelling.
    pub discard_button: Locator,
    pub required_text_fields: Locator,
    pub required_radio_groups: Locator,
    /// Radio input, relative to a radio group.
    pub radio_option: Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    /// Wait for optional elements (file input, form container).
    pub probe_wait_secs: u64,
    pub next_wait_secs: u64,
    pub submit_wait_secs: u64,
    /// Maximum number of "next" clicks before the flow counts as blocked.
    pub max_steps: u32,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            probe_wait_secs: 5,
            next_wait_secs: 5,
            submit_wait_secs: 10,
            max_steps: 15,
        }
    }
}

impl FormSettings {
    fn probe_wait(&self) -> Duration {
        Duration::from_secs(self.probe_wait_secs)
    }

    fn next_wait(&self) -> Duration {
        Duration::from_secs(self.next_wait_secs)
    }

    fn submit_wait(&self) -> Duration {
        Duration::from_secs(self.submit_wait_secs)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Everything a step needs to know about the application in progress.
pub struct ApplyContext<'a> {
    pub posting: &'a Posting,
    pub resume: &'a ResumeDocument,
    /// Empty when generation failed.
    pub cover_letter: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    UnfillableRequiredField { field: String },
    NoProgressControl,
    StepLimitExceeded,
}

impl BlockReason {
    pub fn code(&self) -> &'static str {
        match self {
            BlockReason::UnfillableRequiredField { .. } => "unfillable_required_field",
            BlockReason::NoProgressControl => "no_progress_control",
            BlockReason::StepLimitExceeded => "step_limit_exceeded",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::UnfillableRequiredField { field } => {
                write!(f, "{}: {field}", self.code())
            }
            _ => f.write_str(self.code()),
        }
    }
}

/// Result of one page of the apply flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStepResult {
    Continue,
    Submitted,
    Dismissed(String),
    Blocked(BlockReason),
}

/// Terminal state of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Submitted,
    Dismissed(String),
    Blocked(BlockReason),
}

impl FormOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, FormOutcome::Submitted)
    }

    /// Short explanation stored with failed ledger records.
    pub fn notes(&self) -> Option<String> {
        match self {
            FormOutcome::Submitted => None,
            FormOutcome::Dismissed(reason) => Some(format!("dismissed: {reason}")),
            FormOutcome::Blocked(reason) => Some(format!("blocked: {reason}")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Walker
// ────────────────────────────────────────────────────────────────────────────

pub struct FormWalker<'a> {
    driver: &'a dyn BrowserDriver,
    selectors: &'a FormSelectors,
    filler: &'a dyn FieldFiller,
    pacing: &'a PacingPolicy,
    settings: FormSettings,
}

impl<'a> FormWalker<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        selectors: &'a FormSelectors,
        filler: &'a dyn FieldFiller,
        pacing: &'a PacingPolicy,
        settings: FormSettings,
    ) -> Self {
        Self {
            driver,
            selectors,
            filler,
            pacing,
            settings,
        }
    }

    /// Walks the apply flow that was just opened. Always returns a terminal outcome.
    pub async fn walk(&self, ctx: &ApplyContext<'_>) -> FormOutcome {
        let mut steps: u32 = 0;

        let outcome = loop {
            match self.step(ctx).await {
                Ok(FormStepResult::Continue) => {
                    steps += 1;
                    debug!("Apply flow advanced to step {}", steps + 1);
                    if steps > self.settings.max_steps {
                        break FormOutcome::Blocked(BlockReason::StepLimitExceeded);
                    }
                }
                Ok(FormStepResult::Submitted) => break FormOutcome::Submitted,
                Ok(FormStepResult::Dismissed(reason)) => break FormOutcome::Dismissed(reason),
                Ok(FormStepResult::Blocked(reason)) => break FormOutcome::Blocked(reason),
                Err(e) => break FormOutcome::Dismissed(e.to_string()),
            }
        };

        match &outcome {
            FormOutcome::Submitted => info!(
                "Application submitted for {} at {} after {} step(s)",
                ctx.posting.title,
                ctx.posting.company,
                steps + 1
            ),
            other => {
                warn!(
                    "Apply flow for {} at {} ended without submit: {:?}",
                    ctx.posting.title, ctx.posting.company, other
                );
                self.cancel().await;
            }
        }
        outcome
    }

    async fn step(&self, ctx: &ApplyContext<'_>) -> Result<FormStepResult, DriverError> {
        if self
            .probe(self.selectors.modal, WaitCondition::Present, self.settings.probe_wait())
            .await?
            .is_none()
        {
            return Ok(FormStepResult::Dismissed("form_closed".to_string()));
        }

        if let Some(input) = self
            .probe(
                self.selectors.file_input,
                WaitCondition::Present,
                self.settings.probe_wait(),
            )
            .await?
        {
            self.driver.upload(&input, &ctx.resume.path).await?;
            debug!("Uploaded resume {}", ctx.resume.path.display());
            self.pacing.short().await;
        }

        match self.filler.fill(self.driver, self.selectors, ctx).await {
            Ok(filled) if filled > 0 => debug!("Filled {filled} required field(s)"),
            Ok(_) => {}
            Err(FillError::Unfillable { field }) => {
                return Ok(FormStepResult::Blocked(
                    BlockReason::UnfillableRequiredField { field },
                ));
            }
            Err(FillError::Driver(e)) => return Err(e),
        }

        if let Some(next) = self
            .probe(
                self.selectors.next_button,
                WaitCondition::Clickable,
                self.settings.next_wait(),
            )
            .await?
        {
            self.driver.click(&next).await?;
            self.pacing.short().await;
            return Ok(FormStepResult::Continue);
        }

        if let Some(submit) = self
            .probe(
                self.selectors.submit_button,
                WaitCondition::Clickable,
                self.settings.submit_wait(),
            )
            .await?
        {
            self.driver.click(&submit).await?;
            self.pacing.short().await;
            self.dismiss_confirmation().await;
            return Ok(FormStepResult::Submitted);
        }

        Ok(FormStepResult::Blocked(BlockReason::NoProgressControl))
    }

    /// `None` when the element does not show up in time; hard driver errors propagate.
    async fn probe(
        &self,
        locator: Locator,
        condition: WaitCondition,
        wait: Duration,
    ) -> Result<Option<ElementHandle>, DriverError> {
        match self.driver.wait_for(locator, condition, wait).await {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_absence() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Best effort: the application is already sent.
    async fn dismiss_confirmation(&self) {
        match self
            .driver
            .wait_for(
                self.selectors.confirmation_dismiss,
                WaitCondition::Clickable,
                self.settings.submit_wait(),
            )
            .await
        {
            Ok(close) => {
                if let Err(e) = self.driver.click(&close).await {
                    debug!("Could not close confirmation dialog: {e}");
                }
            }
            Err(e) => debug!("No confirmation dialog to close: {e}"),
        }
    }

    /// Best effort: close the form and discard the draft.
    pub async fn cancel(&self) {
        let close = match self.driver.find(self.selectors.cancel_button).await {
            Ok(close) => close,
            Err(e) => {
                debug!("No cancel control found while abandoning form: {e}");
                return;
            }
        };
        if let Err(e) = self.driver.click(&close).await {
            warn!("Cancel click failed while abandoning form: {e}");
            return;
        }
        if let Ok(discard) = self
            .driver
            .wait_for(
                self.selectors.discard_button,
                WaitCondition::Clickable,
                self.settings.probe_wait(),
            )
            .await
        {
            if let Err(e) = self.driver.click(&discard).await {
                warn!("Discard click failed while abandoning form: {e}");
            }
        }
    }
}

//! Field Filler — answers the required questions on one page of an apply form.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::automation::cover_letter::CoverLetterGenerator;
use crate::automation::form_walker::{ApplyContext, FormSelectors};
use crate::browser::{BrowserDriver, DriverError, ElementHandle};

#[derive(Debug, Error)]
pub enum FillError {
    #[error("No answer for required field '{field}'")]
    Unfillable { field: String },

    #[error("Driver error while filling fields: {0}")]
    Driver(#[from] DriverError),
}

/// Fills every empty required field on the current page and returns how many
/// it touched. Prefilled fields are left alone.
#[async_trait]
pub trait FieldFiller: Send + Sync {
    async fn fill(
        &self,
        driver: &dyn BrowserDriver,
        form: &FormSelectors,
        ctx: &ApplyContext<'_>,
    ) -> Result<usize, FillError>;
}

/// Attributes tried in order to name a text field.
const LABEL_ATTRIBUTES: &[&str] = &["aria-label", "placeholder", "name", "id"];

pub struct StandardFieldFiller {
    /// Lowercased question fragment → answer.
    answers: Vec<(String, String)>,
    generator: Option<CoverLetterGenerator>,
}

impl StandardFieldFiller {
    /// `answers` maps a question fragment to its answer; matching is a
    /// case-insensitive substring test against the field label. With a
    /// generator, unmatched text questions are answered by the model.
    pub fn new(answers: BTreeMap<String, String>, generator: Option<CoverLetterGenerator>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            generator,
        }
    }

    fn configured_answer(&self, label: &str) -> Option<&str> {
        let label = label.to_lowercase();
        self.answers
            .iter()
            .find(|(key, _)| label.contains(key.as_str()))
            .map(|(_, answer)| answer.as_str())
    }

    async fn text_answer(&self, label: &str, ctx: &ApplyContext<'_>) -> Option<String> {
        if label.to_lowercase().contains("cover letter") && !ctx.cover_letter.is_empty() {
            return Some(ctx.cover_letter.to_string());
        }
        if let Some(answer) = self.configured_answer(label) {
            return Some(answer.to_string());
        }
        let generator = self.generator.as_ref()?;
        if label.trim().is_empty() {
            return None;
        }
        match generator
            .answer_question(label, ctx.posting, &ctx.resume.text)
            .await
        {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!("Could not generate an answer for '{label}': {e}");
                None
            }
        }
    }

    async fn fill_text_fields(
        &self,
        driver: &dyn BrowserDriver,
        form: &FormSelectors,
        ctx: &ApplyContext<'_>,
    ) -> Result<usize, FillError> {
        let mut filled = 0;
        for field in driver.find_all(form.required_text_fields).await? {
            let current = driver.attribute(&field, "value").await?.unwrap_or_default();
            if !current.trim().is_empty() {
                continue;
            }
            let label = field_label(driver, &field).await?;
            let Some(answer) = self.text_answer(&label, ctx).await else {
                return Err(FillError::Unfillable { field: label });
            };
            driver.send_keys(&field, &answer).await?;
            debug!("Filled '{label}'");
            filled += 1;
        }
        Ok(filled)
    }

    async fn fill_radio_groups(
        &self,
        driver: &dyn BrowserDriver,
        form: &FormSelectors,
    ) -> Result<usize, FillError> {
        let mut filled = 0;
        for group in driver.find_all(form.required_radio_groups).await? {
            let label = first_line(&driver.text(&group).await?);
            let options = driver.find_in(&group, form.radio_option).await?;
            if options.is_empty() {
                return Err(FillError::Unfillable { field: label });
            }

            let mut already = false;
            for option in &options {
                if driver.is_selected(option).await? {
                    already = true;
                    break;
                }
            }
            if already {
                continue;
            }

            let choice = match self.configured_answer(&label) {
                Some(wanted) => find_option(driver, &options, wanted)
                    .await?
                    .unwrap_or(&options[0]),
                None => &options[0],
            };
            driver.click(choice).await?;
            debug!("Answered '{label}'");
            filled += 1;
        }
        Ok(filled)
    }
}

#[async_trait]
impl FieldFiller for StandardFieldFiller {
    async fn fill(
        &self,
        driver: &dyn BrowserDriver,
        form: &FormSelectors,
        ctx: &ApplyContext<'_>,
    ) -> Result<usize, FillError> {
        let text = self.fill_text_fields(driver, form, ctx).await?;
        let radio = self.fill_radio_groups(driver, form).await?;
        Ok(text + radio)
    }
}

async fn field_label(
    driver: &dyn BrowserDriver,
    field: &ElementHandle,
) -> Result<String, DriverError> {
    for attr in LABEL_ATTRIBUTES {
        if let Some(value) = driver.attribute(field, attr).await? {
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }
    }
    Ok(String::new())
}

/// Option whose value or visible text equals `wanted`, ignoring case.
async fn find_option<'o>(
    driver: &dyn BrowserDriver,
    options: &'o [ElementHandle],
    wanted: &str,
) -> Result<Option<&'o ElementHandle>, DriverError> {
    let wanted = wanted.trim();
    for option in options {
        let value = driver.attribute(option, "value").await?.unwrap_or_default();
        let text = driver.text(option).await?;
        if value.trim().eq_ignore_ascii_case(wanted) || text.trim().eq_ignore_ascii_case(wanted) {
            return Ok(Some(option));
        }
    }
    Ok(None)
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

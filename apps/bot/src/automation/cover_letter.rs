//! Cover Letter Generator — tailored application text from the language model.
//!
//! Generation is an enhancement. Callers treat `GenerationError` as "apply
//! without it", never as a reason to drop the posting.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::automation::prompts::{ANSWER_PROMPT_TEMPLATE, COVER_LETTER_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{APPLICANT_VOICE_SYSTEM, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::{LanguageModel, LlmError};
use crate::models::Posting;

/// Resume and description text beyond this many characters is cut from prompts.
const MAX_PROMPT_SECTION_CHARS: usize = 12_000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Language model returned no usable text")]
    Empty,
}

#[derive(Clone)]
pub struct CoverLetterGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl CoverLetterGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One model call with the fixed cover letter template.
    pub async fn generate(
        &self,
        posting: &Posting,
        resume_text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = fill_template(COVER_LETTER_PROMPT_TEMPLATE, posting, resume_text, &[]);
        let letter = self.complete(&prompt).await?;
        debug!(
            "Generated {}-word cover letter for {} at {}",
            letter.split_whitespace().count(),
            posting.title,
            posting.company
        );
        Ok(letter)
    }

    /// Answers one free-text application question.
    pub async fn answer_question(
        &self,
        question: &str,
        posting: &Posting,
        resume_text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = fill_template(
            ANSWER_PROMPT_TEMPLATE,
            posting,
            resume_text,
            &[("question", question)],
        );
        self.complete(&prompt).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let text = self
            .llm
            .complete(prompt, APPLICANT_VOICE_SYSTEM)
            .await
            .map_err(|e| {
                warn!("Content generation failed: {e}");
                GenerationError::from(e)
            })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

fn fill_template(
    template: &str,
    posting: &Posting,
    resume_text: &str,
    extra: &[(&str, &str)],
) -> String {
    let company = if posting.company.is_empty() {
        "(not listed)"
    } else {
        posting.company.as_str()
    };
    let description = if posting.description.is_empty() {
        "(not available)"
    } else {
        truncate_chars(&posting.description, MAX_PROMPT_SECTION_CHARS)
    };
    let mut values = vec![
        ("title", posting.title.as_str()),
        ("company", company),
        ("job_description", description),
        (
            "resume_text",
            truncate_chars(resume_text, MAX_PROMPT_SECTION_CHARS),
        ),
        ("no_fabrication", NO_FABRICATION_INSTRUCTION),
    ];
    values.extend_from_slice(extra);
    render(template, &values)
}

/// Replaces `{name}` placeholders in one left-to-right pass. Substituted text is
/// never scanned again, and unknown placeholders are kept verbatim.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

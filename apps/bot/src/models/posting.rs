//! Posting — a single job listing as extracted from a platform's posting view.

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Query parameters that carry a job identifier on the supported platforms.
const JOB_ID_PARAMS: &[&str] = &["currentJobId", "jobId", "jk", "vjk"];

/// An extracted job posting. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company: String,
    pub description: String,
    /// Canonical job URL, the ledger key together with the platform name.
    pub url: String,
    /// Stable job identity derived from `url`.
    pub external_id: String,
}

impl Posting {
    /// Builds a posting, canonicalizing `raw_url` and deriving `external_id` from it.
    ///
    /// `canonical_template` is a URL with an `{id}` placeholder. When a job id can be
    /// found in the raw URL the posting URL is rewritten to that form, so the same job
    /// reached through different search pages maps to one ledger key.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        description: impl Into<String>,
        raw_url: &str,
        canonical_template: Option<&str>,
    ) -> Self {
        let (url, external_id) = canonicalize_url(raw_url, canonical_template);
        Self {
            title: title.into(),
            company: company.into(),
            description: description.into(),
            url,
            external_id,
        }
    }
}

/// Returns `(canonical_url, external_id)` for a raw job URL.
pub fn canonicalize_url(raw_url: &str, canonical_template: Option<&str>) -> (String, String) {
    let raw_url = raw_url.trim();
    let Ok(mut parsed) = Url::parse(raw_url) else {
        return (raw_url.to_string(), raw_url.to_string());
    };

    if let Some(id) = job_id(&parsed) {
        let url = match canonical_template {
            Some(template) => template.replace("{id}", &id),
            None => raw_url.to_string(),
        };
        return (url, id);
    }

    parsed.set_query(None);
    parsed.set_fragment(None);
    let stripped = parsed.to_string();
    (stripped.clone(), stripped)
}

/// The job id carried by `raw_url`, if any.
pub fn job_id_of(raw_url: &str) -> Option<String> {
    Url::parse(raw_url.trim()).ok().as_ref().and_then(job_id)
}

fn job_id(url: &Url) -> Option<String> {
    for (key, value) in url.query_pairs() {
        if JOB_ID_PARAMS.contains(&key.as_ref()) && !value.is_empty() {
            return Some(value.into_owned());
        }
    }

    // LinkedIn: /jobs/view/<id>/ or /jobs/view/<slug>-<id>/
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let view = segments.iter().position(|s| *s == "view")?;
    let segment = segments.get(view + 1)?;
    let id = segment.rsplit('-').next().unwrap_or_default();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

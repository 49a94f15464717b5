// Application Orchestration Engine
// Pacing, ledger, extraction, form walking, cover letters and the run driver.
// All browser access goes through `crate::browser::BrowserDriver`.

pub mod cover_letter;
pub mod extractor;
pub mod field_filler;
pub mod form_walker;
pub mod ledger;
pub mod orchestrator;
pub mod pacing;
pub mod prompts;
pub mod registry;
pub mod resume;

// Shared prompt fragments.
// Each component that calls the model keeps its own prompts.rs next to it;
// this file holds the pieces they all reuse.

/// System prompt for any text written in the applicant's voice.
pub const APPLICANT_VOICE_SYSTEM: &str = "You are writing on behalf of a job applicant. \
    Write in the first person, in a professional and specific tone. \
    Respond with the requested text only: no preamble, no headings, \
    no markdown, no placeholders in square brackets.";

/// Appended to every prompt that draws on the applicant's resume.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    Use only experience, skills and achievements that appear in the resume. \
    Do NOT invent employers, titles, dates, degrees or metrics. \
    If the resume does not support a claim, leave it out.";

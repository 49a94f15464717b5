// Prompt templates for application content.
// Shared fragments live in llm_client::prompts.

/// Cover letter prompt.
/// Replace: {title}, {company}, {job_description}, {resume_text}, {no_fabrication}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Generate a tailored cover letter based on the following information.

Job Title:
{title}

Company:
{company}

Job Description:
{job_description}

Applicant's Resume:
{resume_text}

The cover letter should:
- Be professional but not generic
- Highlight relevant skills from the resume that match the job
- Be about 250-300 words
- Address the hiring manager directly if possible
- Include a strong opening and closing

{no_fabrication}"#;

/// Application question prompt.
/// Replace: {question}, {title}, {company}, {job_description}, {resume_text}, {no_fabrication}
pub const ANSWER_PROMPT_TEMPLATE: &str = r#"Answer the following job application question for the applicant.

Question:
{question}

Role: {title} at {company}

Job Description:
{job_description}

Resume:
{resume_text}

The answer should:
- Be concise but complete
- Incorporate relevant experience from the resume
- Use metrics and achievements where the resume provides them
- Be about 50-100 words; if the question asks for a number, a date or yes/no, answer with just that

{no_fabrication}"#;

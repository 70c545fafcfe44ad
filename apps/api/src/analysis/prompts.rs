// All prompt constants for the analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.
// Templates are filled with `render_template` in a single pass; they MUST NOT
// contain anything time- or request-dependent so rendering stays byte-identical.

/// System prompt for resume/JD analysis.
pub const ANALYSIS_SYSTEM: &str = "You are an expert career coach and resume analyst. \
    You compare a candidate's resume against a job description and report the fit.";

/// Analysis prompt template.
/// Replace: {boundary_instruction}, {resume_block}, {jd_block}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"{boundary_instruction}

{resume_block}

{jd_block}

Analyse how well the resume matches the job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 7.5,
  "matched_skills": ["Python"],
  "missing_skills": ["Docker", "Kubernetes"],
  "advice": "One short paragraph of actionable advice.",
  "recommended_roles": [{"role": "Backend Developer", "score": 80}],
  "suggestions": ["Quantify the impact of your Flask project."],
  "skills_found": ["Python", "Flask"],
  "required_skills": ["Python", "Docker", "Kubernetes"],
  "relevant_projects": [{"snippet": "Built a REST API with Flask", "score": 7}]
}

FIELD RULES:
- "score": number between 0 and 10 inclusive (e.g. 7.5). NEVER a score out of 100. NEVER a string.
- "matched_skills": array of strings; skills required by the job that the resume demonstrates. No duplicates.
- "missing_skills": array of strings; important job requirements absent from the resume. No duplicates.
- "advice": string; a concise paragraph of advice for this specific job.
- "recommended_roles": array of at most 5 objects; "role" is a job title, "score" an integer 0-100.
- "suggestions": array of at most 5 strings; concrete edits to the resume for this job.
- "skills_found": array of at most 20 strings; every notable skill the resume shows, job-related or not.
- "required_skills": array of at most 20 strings; every skill the job description asks for.
- "relevant_projects": array of at most 3 objects; "snippet" is a short quote of a resume project relevant to the job, "score" an integer 0-10."#;

/// System prompt for follow-up coaching turns.
pub const CHAT_SYSTEM: &str = "You are a friendly and encouraging career coach. \
    You are chatting with a candidate who has just had their resume analysed against a job. \
    Answer directly and concisely (at most 3 sentences). \
    Use the analysis to give specific advice, mentioning concrete gaps or skills. \
    If asked about other fields, use general knowledge but link it back to their gaps. \
    Be motivational. Reply in plain text, never JSON.";

/// Chat prompt template.
/// Replace: {boundary_instruction}, {anchor_summary}, {resume_block},
///          {history_block}, {message_block}
pub const CHAT_PROMPT_TEMPLATE: &str = r#"{boundary_instruction}

ANALYSIS OF THE CANDIDATE:
{anchor_summary}

{resume_block}

RECENT CONVERSATION:
{history_block}

{message_block}

Reply to the candidate's latest message."#;

/// Rendered in place of the history block when there are no prior turns.
pub const EMPTY_HISTORY: &str = "(no previous messages)";

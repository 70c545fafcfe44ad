//! Text Normalizer: cleans extracted text before it enters any prompt.
//!
//! Pure functions only. Lengths are counted in `char`s, not bytes, so a
//! truncation can never split a UTF-8 sequence.

use serde::Serialize;
use thiserror::Error;

use crate::analysis::models::AnalysisRequest;

/// Appended exactly when input was cut to fit its budget.
pub const TRUNCATION_MARKER: &str = " [TRUNCATED]";
/// Same length as the marker; replaces a marker that was already in the input.
const LITERAL_MARKER: &str = " (TRUNCATED)";
/// The job description always keeps at least this much of the combined budget.
pub const MIN_JD_SHARE: usize = 500;

/// Smallest budget for which truncated output can still carry the marker.
pub fn min_budget() -> usize {
    TRUNCATION_MARKER.chars().count() + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    pub text: String,
    pub truncated: bool,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Strips control characters, collapses every whitespace run to one space,
/// trims, then truncates to `max_chars` (marker included). Untruncated text
/// never ends with the marker.
///
/// `max_chars` is expected to be at least [`min_budget`]; `Config` enforces this.
pub fn normalize(text: &str, max_chars: usize) -> NormalizedText {
    let mut collapsed = String::with_capacity(text.len().min(max_chars * 4));
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !collapsed.is_empty() {
                collapsed.push(' ');
            }
            pending_space = false;
            collapsed.push(c);
        }
    }

    if collapsed.chars().count() <= max_chars {
        if collapsed.ends_with(TRUNCATION_MARKER) {
            collapsed.truncate(collapsed.len() - TRUNCATION_MARKER.len());
            collapsed.push_str(LITERAL_MARKER);
        }
        return NormalizedText {
            text: collapsed,
            truncated: false,
        };
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut text: String = collapsed.chars().take(keep).collect();
    text.truncate(text.trim_end().len());
    text.push_str(TRUNCATION_MARKER);
    NormalizedText {
        text,
        truncated: true,
    }
}

/// Per-field and combined character budgets for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_resume_chars: usize,
    pub max_jd_chars: usize,
    pub max_combined_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_resume_chars: 20_000,
            max_jd_chars: 10_000,
            max_combined_chars: 28_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Resume,
    JobDescription,
    ChatMessage,
}

impl std::fmt::Display for InputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InputField::Resume => "resume_text",
            InputField::JobDescription => "job_description_text",
            InputField::ChatMessage => "message",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} is empty after normalization")]
pub struct EmptyInput(pub InputField);

/// Normalized, budget-checked analysis input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    pub resume: NormalizedText,
    pub job_description: NormalizedText,
}

/// Normalizes both documents under the combined budget.
///
/// The resume is prioritized: it is cut first to its own budget (leaving
/// `MIN_JD_SHARE` for the job description), and the job description gets
/// whatever combined budget remains.
pub fn prepare(request: &AnalysisRequest, limits: &InputLimits) -> Result<PreparedInput, EmptyInput> {
    let resume_budget = limits
        .max_resume_chars
        .min(limits.max_combined_chars.saturating_sub(MIN_JD_SHARE));
    let resume = normalize(&request.resume_text, resume_budget);
    if resume.is_empty() {
        return Err(EmptyInput(InputField::Resume));
    }

    let jd_budget = limits
        .max_jd_chars
        .min(limits.max_combined_chars.saturating_sub(resume.char_len()));
    let job_description = normalize(&request.job_description_text, jd_budget);
    if job_description.is_empty() {
        return Err(EmptyInput(InputField::JobDescription));
    }

    Ok(PreparedInput {
        resume,
        job_description,
    })
}

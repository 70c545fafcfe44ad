use serde::{Deserialize, Serialize};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;
/// Role suggestions are scored on a 0–100 scale.
pub const ROLE_SCORE_MAX: u8 = 100;
/// Cap on `recommended_roles` and `suggestions`.
pub const MAX_EXTRAS: usize = 5;
/// Cap on `skills_found` and `required_skills`.
pub const MAX_SKILL_EXTRAS: usize = 20;
/// Only the most relevant projects are kept.
pub const MAX_PROJECTS: usize = 3;

/// Inbound analysis request. Both texts are raw (pre-normalization).
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_description_text: String,
}

/// A role the candidate's skills point towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMatch {
    pub role: String,
    /// 0 – 100
    pub score: u8,
}

/// A resume project relevant to the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMatch {
    pub snippet: String,
    /// 0 – 10
    pub score: u8,
}

/// Validated, typed outcome of one analysis.
///
/// Invariants (enforced by the validator, never by callers):
/// - `score` is finite and within `[SCORE_MIN, SCORE_MAX]`
/// - `matched_skills` and `missing_skills` are each duplicate-free, in model output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub advice: String,
    #[serde(default)]
    pub recommended_roles: Vec<RoleMatch>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Skills read off the resume, independent of the job.
    #[serde(default)]
    pub skills_found: Vec<String>,
    /// Skills the job description asks for.
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub relevant_projects: Vec<ProjectMatch>,
}

impl AnalysisResult {
    /// One-line summary used to ground chat prompts.
    pub fn summary_line(&self) -> String {
        format!("Match score: {:.1}/10", self.score)
    }
}

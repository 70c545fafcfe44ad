//! Prompt Builder: renders analysis and chat requests into generation prompts.
//!
//! Rendering is a pure function of its inputs: identical inputs give
//! byte-identical prompts (no clocks, ids or map iteration order).

use crate::analysis::models::AnalysisResult;
use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, CHAT_PROMPT_TEMPLATE, CHAT_SYSTEM, EMPTY_HISTORY,
};
use crate::llm_client::prompts::{
    fenced, render_template, DOCUMENT_BOUNDARY_INSTRUCTION, JSON_ONLY_SYSTEM,
};
use crate::llm_client::Prompt;
use crate::session::models::{ChatTurn, Role};

/// Default number of recent turns rendered into a chat prompt.
pub const DEFAULT_CHAT_WINDOW: usize = 10;
/// Max skills listed per category in the chat anchor summary.
const SUMMARY_SKILL_LIMIT: usize = 10;
const SUMMARY_ROLE_LIMIT: usize = 3;

/// Builds the structured-analysis prompt from normalized resume and JD text.
pub fn build_analysis_prompt(resume: &str, job_description: &str) -> Prompt {
    let user = render_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("boundary_instruction", DOCUMENT_BOUNDARY_INSTRUCTION),
            ("resume_block", &fenced("RESUME", resume)),
            ("jd_block", &fenced("JOB DESCRIPTION", job_description)),
        ],
    );

    Prompt {
        system: format!("{ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}"),
        user,
    }
}

/// Builds a coaching prompt grounded in the session anchor.
///
/// Only the `window` most recent turns of `history` are rendered.
pub fn build_chat_prompt(
    anchor: &AnalysisResult,
    resume: &str,
    history: &[ChatTurn],
    new_message: &str,
    window: usize,
) -> Prompt {
    let recent = &history[history.len().saturating_sub(window)..];
    let history_block = if recent.is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        fenced("CONVERSATION", &render_history(recent))
    };

    let user = render_template(
        CHAT_PROMPT_TEMPLATE,
        &[
            ("boundary_instruction", DOCUMENT_BOUNDARY_INSTRUCTION),
            ("anchor_summary", &render_anchor(anchor)),
            ("resume_block", &fenced("RESUME", resume)),
            ("history_block", &history_block),
            ("message_block", &fenced("CANDIDATE MESSAGE", new_message)),
        ],
    );

    Prompt {
        system: CHAT_SYSTEM.to_string(),
        user,
    }
}

fn render_anchor(anchor: &AnalysisResult) -> String {
    let mut lines = vec![
        format!("- {}", anchor.summary_line()),
        format!(
            "- Matched skills: {}",
            join_or_none(&anchor.matched_skills, SUMMARY_SKILL_LIMIT)
        ),
        format!(
            "- Missing skills (gaps): {}",
            join_or_none(&anchor.missing_skills, SUMMARY_SKILL_LIMIT)
        ),
    ];

    if !anchor.skills_found.is_empty() {
        lines.push(format!(
            "- Top resume skills: {}",
            join_or_none(&anchor.skills_found, SUMMARY_SKILL_LIMIT)
        ));
    }
    if !anchor.recommended_roles.is_empty() {
        let roles: Vec<String> = anchor
            .recommended_roles
            .iter()
            .take(SUMMARY_ROLE_LIMIT)
            .map(|r| format!("{} ({}/100)", r.role, r.score))
            .collect();
        lines.push(format!("- Recommended roles: {}", roles.join(", ")));
    }
    if !anchor.advice.is_empty() {
        lines.push(format!("- Advice already given: {}", anchor.advice));
    }

    lines.join("\n")
}

fn join_or_none(items: &[String], limit: usize) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn render_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| {
            let speaker = match t.role {
                Role::User => "Candidate",
                Role::Assistant => "Coach",
            };
            format!("{speaker}: {}", t.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

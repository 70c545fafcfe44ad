//! Response Validator: turns raw generation output into a typed `AnalysisResult`.
//!
//! Three outcomes:
//! - `Err(Malformed)`: no usable payload (or no usable score). Retryable upstream.
//! - `Err(OutOfRange)`: a numeric field parsed but cannot be made valid. Terminal.
//! - `Ok(Validated)`: a result, possibly with coercions applied (PARTIAL).
//!
//! Field names are matched case- and separator-insensitively, and common
//! aliases are accepted; alias resolution alone is not a coercion.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::analysis::models::{
    AnalysisResult, ProjectMatch, RoleMatch, MAX_EXTRAS, MAX_PROJECTS, MAX_SKILL_EXTRAS,
    ROLE_SCORE_MAX, SCORE_MAX, SCORE_MIN,
};

const SCORE_KEYS: &[&str] = &["score", "overallscore", "matchscore", "fitscore"];
const MATCHED_KEYS: &[&str] = &["matchedskills", "matched", "skillsmatched", "matchingskills"];
const MISSING_KEYS: &[&str] = &["missingskills", "missing", "gaps", "skillgaps", "skillsmissing"];
const ADVICE_KEYS: &[&str] = &["advice", "summary", "recommendation", "feedback"];
const ROLE_KEYS: &[&str] = &["recommendedroles", "recommendedjobs", "roles"];
const SUGGESTION_KEYS: &[&str] = &["suggestions", "resumesuggestions"];
const SKILLS_FOUND_KEYS: &[&str] = &["skillsfound", "resumeskills", "candidateskills"];
const REQUIRED_SKILLS_KEYS: &[&str] = &["requiredskills", "jobskills", "jdskills"];
const PROJECT_KEYS: &[&str] = &["relevantprojects", "projects"];

/// `8.5`, `8.5/10`, `85 / 100`, `85%`, `7 out of 10` (trailing text ignored).
static SCORE_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?\d+(?:\.\d+)?)\s*(?:(?:/|out of)\s*(\d+(?:\.\d+)?)|(%))?")
        .expect("score pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("field `{field}` out of range: {detail}")]
    OutOfRange { field: &'static str, detail: String },
}

impl ValidationError {
    /// Only malformed output is worth regenerating with the same prompt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ValidationError::Malformed(_))
    }
}

/// A repair applied to one field of an otherwise usable payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coercion {
    /// Score given as text, e.g. `"8.5/10"`.
    ScoreFromText { raw: String },
    /// Score given on another scale (`/100`, `%`) and rescaled to 0–10.
    ScoreRescaled { raw: String },
    ScoreClamped { original: f64 },
    ListFromScalar { field: &'static str },
    EntriesDropped { field: &'static str, count: usize },
    DuplicatesRemoved { field: &'static str, count: usize },
    FieldDefaulted { field: &'static str },
    AdviceFromList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Complete,
    Partial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub result: AnalysisResult,
    pub coercions: Vec<Coercion>,
}

impl Validated {
    pub fn classification(&self) -> Classification {
        if self.coercions.is_empty() {
            Classification::Complete
        } else {
            Classification::Partial
        }
    }
}

/// Validates raw generation output against the analysis schema.
pub fn validate(raw_text: &str) -> Result<Validated, ValidationError> {
    let payload = locate_payload(raw_text)
        .ok_or_else(|| ValidationError::Malformed("no JSON object found in output".into()))?;

    let mut coercions = Vec::new();

    let score = coerce_score(field(&payload, SCORE_KEYS), &mut coercions)?;
    let matched_skills = coerce_list("matched_skills", field(&payload, MATCHED_KEYS), &mut coercions);
    let missing_skills = coerce_list("missing_skills", field(&payload, MISSING_KEYS), &mut coercions);
    let advice = coerce_advice(field(&payload, ADVICE_KEYS), &mut coercions);

    Ok(Validated {
        result: AnalysisResult {
            score,
            matched_skills,
            missing_skills,
            advice,
            recommended_roles: extract_roles(field(&payload, ROLE_KEYS)),
            suggestions: extract_strings(field(&payload, SUGGESTION_KEYS), MAX_EXTRAS),
            skills_found: extract_strings(field(&payload, SKILLS_FOUND_KEYS), MAX_SKILL_EXTRAS),
            required_skills: extract_strings(
                field(&payload, REQUIRED_SKILLS_KEYS),
                MAX_SKILL_EXTRAS,
            ),
            relevant_projects: extract_projects(field(&payload, PROJECT_KEYS)),
        },
        coercions,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Payload location
// ────────────────────────────────────────────────────────────────────────────

/// Finds the first outermost `{...}` block that parses as a JSON object.
/// Handles prose before/after the payload and markdown code fences.
fn locate_payload(raw: &str) -> Option<Map<String, Value>> {
    let mut from = 0;
    while let Some(offset) = raw[from..].find('{') {
        let start = from + offset;
        match matching_brace(raw, start) {
            Some(end) => {
                if let Ok(Value::Object(map)) = serde_json::from_str(&raw[start..=end]) {
                    return Some(map);
                }
                from = end + 1;
            }
            None => from = start + 1,
        }
    }
    None
}

/// Byte index of the `}` closing the `{` at `start`, skipping braces inside strings.
fn matching_brace(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in raw.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Looks up the first alias present, in alias priority order.
fn field<'a>(payload: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        payload
            .iter()
            .find(|(k, _)| normalize_key(k) == *alias)
            .map(|(_, v)| v)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Field coercion
// ────────────────────────────────────────────────────────────────────────────

fn coerce_score(value: Option<&Value>, coercions: &mut Vec<Coercion>) -> Result<f64, ValidationError> {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ValidationError::Malformed(format!("score {n} is not a float")))?,
        Some(Value::String(s)) => parse_score_text(s, coercions)?,
        Some(Value::Null) | None => {
            return Err(ValidationError::Malformed("score is missing".into()));
        }
        Some(other) => {
            return Err(ValidationError::Malformed(format!(
                "score is not numeric: {other}"
            )));
        }
    };

    if !parsed.is_finite() {
        return Err(ValidationError::OutOfRange {
            field: "score",
            detail: format!("{parsed} is not a finite number"),
        });
    }

    if !(SCORE_MIN..=SCORE_MAX).contains(&parsed) {
        coercions.push(Coercion::ScoreClamped { original: parsed });
        return Ok(parsed.clamp(SCORE_MIN, SCORE_MAX));
    }
    Ok(parsed)
}

fn parse_score_text(raw: &str, coercions: &mut Vec<Coercion>) -> Result<f64, ValidationError> {
    // A whole-string number ("8.5", "1e3", "NaN") is taken as is; range checks follow.
    if let Ok(v) = raw.trim().parse::<f64>() {
        if !v.is_finite() {
            return Err(ValidationError::OutOfRange {
                field: "score",
                detail: format!("{raw:?} is not a finite number"),
            });
        }
        coercions.push(Coercion::ScoreFromText { raw: raw.to_string() });
        return Ok(v);
    }

    let caps = SCORE_TEXT
        .captures(raw)
        .ok_or_else(|| ValidationError::Malformed(format!("score is not numeric: {raw:?}")))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ValidationError::Malformed(format!("score is not numeric: {raw:?}")))?;

    if let Some(denominator) = caps.get(2) {
        let denominator: f64 = denominator
            .as_str()
            .parse()
            .map_err(|_| ValidationError::Malformed(format!("bad score scale: {raw:?}")))?;
        if denominator == 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "score",
                detail: format!("{raw:?} has a zero scale"),
            });
        }
        if denominator == SCORE_MAX {
            coercions.push(Coercion::ScoreFromText { raw: raw.to_string() });
            return Ok(value);
        }
        coercions.push(Coercion::ScoreRescaled { raw: raw.to_string() });
        return Ok(value / denominator * SCORE_MAX);
    }

    if caps.get(3).is_some() {
        coercions.push(Coercion::ScoreRescaled { raw: raw.to_string() });
        return Ok(value / 100.0 * SCORE_MAX);
    }

    coercions.push(Coercion::ScoreFromText { raw: raw.to_string() });
    Ok(value)
}

fn coerce_list(
    field_name: &'static str,
    value: Option<&Value>,
    coercions: &mut Vec<Coercion>,
) -> Vec<String> {
    let raw_items: Vec<String> = match value {
        None | Some(Value::Null) => {
            coercions.push(Coercion::FieldDefaulted { field: field_name });
            return Vec::new();
        }
        Some(Value::Array(items)) => {
            let kept: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            let dropped = items.len() - kept.len();
            if dropped > 0 {
                coercions.push(Coercion::EntriesDropped {
                    field: field_name,
                    count: dropped,
                });
            }
            kept
        }
        Some(Value::String(s)) if !s.trim().is_empty() => {
            coercions.push(Coercion::ListFromScalar { field: field_name });
            vec![s.trim().to_string()]
        }
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => {
            coercions.push(Coercion::ListFromScalar { field: field_name });
            vec![scalar.to_string()]
        }
        Some(_) => {
            coercions.push(Coercion::FieldDefaulted { field: field_name });
            return Vec::new();
        }
    };

    let before = raw_items.len();
    let items = dedup_case_insensitive(raw_items);
    if items.len() < before {
        coercions.push(Coercion::DuplicatesRemoved {
            field: field_name,
            count: before - items.len(),
        });
    }
    items
}

fn coerce_advice(value: Option<&Value>, coercions: &mut Vec<Coercion>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => {
            coercions.push(Coercion::AdviceFromList);
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
        _ => {
            coercions.push(Coercion::FieldDefaulted { field: "advice" });
            String::new()
        }
    }
}

/// Keeps the first occurrence of each entry, comparing case-insensitively.
fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

// Extras are best-effort: bad entries are dropped silently and never make a
// result PARTIAL.

fn extract_roles(value: Option<&Value>) -> Vec<RoleMatch> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let role = field(obj, &["role", "title"])?.as_str()?.trim();
            if role.is_empty() || !seen.insert(role.to_lowercase()) {
                return None;
            }
            let score = extra_score(field(obj, &["score"]), ROLE_SCORE_MAX);
            Some(RoleMatch {
                role: role.to_string(),
                score,
            })
        })
        .take(MAX_EXTRAS)
        .collect()
}

fn extract_projects(value: Option<&Value>) -> Vec<ProjectMatch> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| {
            let (snippet, score) = match item {
                Value::String(s) => (s.trim(), 0),
                Value::Object(obj) => (
                    field(obj, &["snippet", "project", "name", "title"])?
                        .as_str()?
                        .trim(),
                    extra_score(field(obj, &["score", "relevance"]), SCORE_MAX as u8),
                ),
                _ => return None,
            };
            if snippet.is_empty() || !seen.insert(snippet.to_lowercase()) {
                return None;
            }
            Some(ProjectMatch {
                snippet: snippet.to_string(),
                score,
            })
        })
        .take(MAX_PROJECTS)
        .collect()
}

/// Lenient integer score for an extra: unparseable or non-finite is 0, then clamped.
fn extra_score(value: Option<&Value>, max: u8) -> u8 {
    value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        })
        .filter(|s: &f64| s.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, max as f64)
        .round() as u8
}

fn extract_strings(value: Option<&Value>, limit: usize) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    let mut items = dedup_case_insensitive(items);
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "score": 4,
        "matched_skills": ["Python"],
        "missing_skills": ["Docker", "Kubernetes"],
        "advice": "Gain container orchestration experience."
    }"#;

    fn validated(raw: &str) -> Validated {
        validate(raw).unwrap_or_else(|e| panic!("expected Ok for {raw:?}, got {e:?}"))
    }

    #[test]
    fn test_well_formed_payload_has_no_coercions() {
        let v = validated(WELL_FORMED);
        assert_eq!(v.classification(), Classification::Complete);
        assert!(v.coercions.is_empty());
        assert_eq!(v.result.score, 4.0);
        assert_eq!(v.result.matched_skills, vec!["Python"]);
        assert_eq!(v.result.missing_skills, vec!["Docker", "Kubernetes"]);
        assert_eq!(v.result.advice, "Gain container orchestration experience.");
    }

    #[test]
    fn test_payload_wrapped_in_prose_and_fences() {
        let raw = format!("Sure! Here is the analysis:\n```json\n{WELL_FORMED}\n```\nGood luck {{you}}!");
        let v = validated(&raw);
        assert_eq!(v.classification(), Classification::Complete);
        assert_eq!(v.result.score, 4.0);
    }

    #[test]
    fn test_skips_non_json_brace_blocks_before_payload() {
        let raw = format!("Note {{not json}} then {WELL_FORMED}");
        assert_eq!(validated(&raw).result.matched_skills, vec!["Python"]);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_location() {
        let raw = r#"{"score": 6, "matched_skills": ["C{++}"], "missing_skills": [], "advice": "use } and { wisely"}"#;
        let v = validated(raw);
        assert_eq!(v.result.matched_skills, vec!["C{++}"]);
        assert_eq!(v.result.advice, "use } and { wisely");
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let raw = r#"{"score": 6, "matched_skills": [], "missing_skills": [], "advice": "say \"hi\" {"}"#;
        assert_eq!(validated(raw).result.advice, "say \"hi\" {");
    }

    #[test]
    fn test_no_payload_is_malformed() {
        for raw in ["", "I cannot help with that.", "{\"score\": 5", "[1, 2, 3]"] {
            let err = validate(raw).unwrap_err();
            assert!(matches!(err, ValidationError::Malformed(_)), "{raw:?}");
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_score_as_fraction_text_is_partial() {
        let raw = r#"{"score": "8.5/10", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        let v = validated(raw);
        assert_eq!(v.result.score, 8.5);
        assert_eq!(v.classification(), Classification::Partial);
        assert_eq!(
            v.coercions,
            vec![Coercion::ScoreFromText {
                raw: "8.5/10".into()
            }]
        );
    }

    #[test]
    fn test_score_on_hundred_scale_is_rescaled() {
        let raw = r#"{"score": "85/100", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        let v = validated(raw);
        assert!((v.result.score - 8.5).abs() < 1e-9);
        assert!(matches!(v.coercions[0], Coercion::ScoreRescaled { .. }));

        let raw = r#"{"score": "70%", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert!((validated(raw).result.score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_text_in_exponent_form_is_parsed_whole() {
        let raw = r#"{"score": "1e3", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        let v = validated(raw);
        assert_eq!(v.result.score, 10.0);
        assert_eq!(
            v.coercions,
            vec![
                Coercion::ScoreFromText { raw: "1e3".into() },
                Coercion::ScoreClamped { original: 1000.0 },
            ]
        );

        let raw = r#"{"score": " 8.5e0 ", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert_eq!(validated(raw).result.score, 8.5);

        let raw = r#"{"score": "2.5E-1", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert_eq!(validated(raw).result.score, 0.25);
    }

    #[test]
    fn test_score_out_of_range_is_clamped() {
        let raw = r#"{"score": 85, "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        let v = validated(raw);
        assert_eq!(v.result.score, 10.0);
        assert_eq!(v.coercions, vec![Coercion::ScoreClamped { original: 85.0 }]);

        let raw = r#"{"score": -2.5, "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert_eq!(validated(raw).result.score, 0.0);
    }

    #[test]
    fn test_non_finite_score_is_out_of_range() {
        for score in ["\"NaN\"", "\"inf\"", "\"7/0\""] {
            let raw = format!(
                r#"{{"score": {score}, "matched_skills": [], "missing_skills": [], "advice": ""}}"#
            );
            let err = validate(&raw).unwrap_err();
            assert!(
                matches!(err, ValidationError::OutOfRange { field: "score", .. }),
                "{score}: {err:?}"
            );
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_missing_or_non_numeric_score_is_malformed() {
        let raw = r#"{"matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert!(matches!(validate(raw), Err(ValidationError::Malformed(_))));
        let raw = r#"{"score": "high", "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert!(matches!(validate(raw), Err(ValidationError::Malformed(_))));
        let raw = r#"{"score": true, "matched_skills": [], "missing_skills": [], "advice": ""}"#;
        assert!(matches!(validate(raw), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_scalar_skill_becomes_single_element_list() {
        let raw = r#"{"score": 5, "matched_skills": "Python", "missing_skills": [], "advice": ""}"#;
        let v = validated(raw);
        assert_eq!(v.result.matched_skills, vec!["Python"]);
        assert_eq!(
            v.coercions,
            vec![Coercion::ListFromScalar {
                field: "matched_skills"
            }]
        );
    }

    #[test]
    fn test_non_string_entries_dropped_and_duplicates_removed() {
        let raw = r#"{
            "score": 5,
            "matched_skills": ["Python", 3, null, "python", " Flask ", "Python", ""],
            "missing_skills": ["Docker"],
            "advice": "ok"
        }"#;
        let v = validated(raw);
        assert_eq!(v.result.matched_skills, vec!["Python", "Flask"]);
        assert!(v.coercions.contains(&Coercion::EntriesDropped {
            field: "matched_skills",
            count: 3
        }));
        assert!(v.coercions.contains(&Coercion::DuplicatesRemoved {
            field: "matched_skills",
            count: 2
        }));
        assert_eq!(v.classification(), Classification::Partial);
    }

    #[test]
    fn test_missing_fields_default_without_failing() {
        let v = validated(r#"{"score": 3}"#);
        assert!(v.result.matched_skills.is_empty());
        assert!(v.result.missing_skills.is_empty());
        assert_eq!(v.result.advice, "");
        assert_eq!(v.coercions.len(), 3);
        assert!(v.coercions.contains(&Coercion::FieldDefaulted { field: "advice" }));
    }

    #[test]
    fn test_advice_list_is_joined() {
        let raw = r#"{"score": 5, "matched_skills": [], "missing_skills": [], "advice": ["Learn Docker.", "Ship a project."]}"#;
        let v = validated(raw);
        assert_eq!(v.result.advice, "Learn Docker. Ship a project.");
        assert_eq!(v.coercions, vec![Coercion::AdviceFromList]);
    }

    #[test]
    fn test_inconsistent_casing_and_aliases_are_accepted() {
        let raw = r#"{
            "Score": 4,
            "matchedSkills": ["Python"],
            "Missing-Skills": ["Docker"],
            "ADVICE": "Go."
        }"#;
        let v = validated(raw);
        assert_eq!(v.classification(), Classification::Complete);
        assert_eq!(v.result.matched_skills, vec!["Python"]);
        assert_eq!(v.result.missing_skills, vec!["Docker"]);

        let raw = r#"{"overall_score": 7.5, "matched": ["Rust"], "gaps": ["Go"], "advice": "x"}"#;
        let v = validated(raw);
        assert_eq!(v.result.score, 7.5);
        assert_eq!(v.result.missing_skills, vec!["Go"]);
        assert!(v.coercions.is_empty());
    }

    #[test]
    fn test_extras_are_best_effort() {
        let raw = r#"{
            "score": 6,
            "matched_skills": [],
            "missing_skills": [],
            "advice": "",
            "recommended_jobs": [
                {"role": "Backend Developer", "score": 82.6},
                {"title": "Data Engineer", "score": "140"},
                {"score": 50},
                {"role": "backend developer", "score": 10},
                "junk"
            ],
            "resume_suggestions": ["Add metrics", "add metrics", "", "Mention Docker"]
        }"#;
        let v = validated(raw);
        assert!(v.coercions.is_empty());
        assert_eq!(
            v.result.recommended_roles,
            vec![
                RoleMatch {
                    role: "Backend Developer".into(),
                    score: 83
                },
                RoleMatch {
                    role: "Data Engineer".into(),
                    score: 100
                },
            ]
        );
        assert_eq!(v.result.suggestions, vec!["Add metrics", "Mention Docker"]);
    }

    #[test]
    fn test_skill_inventories_and_projects_are_extracted() {
        let raw = r#"{
            "score": 6,
            "matched_skills": ["Python"],
            "missing_skills": ["Docker"],
            "advice": "",
            "skillsFound": ["Python", "Flask", "python", 3, " "],
            "required_skills": "Docker",
            "relevant_projects": [
                {"snippet": "Built a Flask REST API serving 10k users", "score": 8.6},
                {"name": "Inventory CLI", "relevance": "42"},
                "Kaggle notebook",
                {"snippet": "built a flask rest api serving 10k users", "score": 2},
                {"score": 9},
                {"snippet": "Fourth project", "score": 5}
            ]
        }"#;
        let v = validated(raw);
        assert!(v.coercions.is_empty());
        assert_eq!(v.result.skills_found, vec!["Python", "Flask"]);
        assert_eq!(v.result.required_skills, vec!["Docker"]);
        assert_eq!(
            v.result.relevant_projects,
            vec![
                ProjectMatch {
                    snippet: "Built a Flask REST API serving 10k users".into(),
                    score: 9
                },
                ProjectMatch {
                    snippet: "Inventory CLI".into(),
                    score: 10
                },
                ProjectMatch {
                    snippet: "Kaggle notebook".into(),
                    score: 0
                },
            ]
        );
    }

    #[test]
    fn test_skill_inventories_are_capped() {
        let skills: Vec<String> = (0..30).map(|i| format!("\"skill-{i}\"")).collect();
        let raw = format!(
            r#"{{"score": 5, "matched_skills": [], "missing_skills": [], "advice": "", "resume_skills": [{}], "relevant_projects": {{"a": 1}}}}"#,
            skills.join(", ")
        );
        let v = validated(&raw);
        assert_eq!(v.result.skills_found.len(), MAX_SKILL_EXTRAS);
        assert_eq!(v.result.skills_found[0], "skill-0");
        assert!(v.result.relevant_projects.is_empty());
        assert!(v.coercions.is_empty());
    }

    #[test]
    fn test_valid_results_keep_invariants() {
        let raws = [
            WELL_FORMED,
            r#"{"score": 1000, "matched_skills": ["a", "A", "a"], "missing_skills": "b"}"#,
            r#"{"score": "-3", "missing_skills": ["x", "x"]}"#,
            r#"text {"score": "9.99 out of 10", "matched_skills": [1, 2, "z"]} text"#,
        ];
        for raw in raws {
            let r = validated(raw).result;
            assert!(r.score.is_finite() && (0.0..=10.0).contains(&r.score));
            for list in [&r.matched_skills, &r.missing_skills] {
                let unique: HashSet<_> = list.iter().map(|s| s.to_lowercase()).collect();
                assert_eq!(unique.len(), list.len());
            }
        }
    }
}

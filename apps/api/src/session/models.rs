use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::models::AnalysisResult;

pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a coaching conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Server-side conversation state anchored to one analysis.
#[derive(Debug)]
pub struct Session {
    pub session_id: SessionId,
    /// Never replaced or evicted independently of the session.
    pub anchor: AnalysisResult,
    pub resume_text: String,
    pub history: VecDeque<ChatTurn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: SessionId, resume_text: String, anchor: AnalysisResult) -> Self {
        Self {
            session_id,
            anchor,
            resume_text,
            history: VecDeque::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends `turn`, dropping the oldest turns beyond `cap`.
    /// Returns how many turns were dropped.
    pub fn push_turn(&mut self, turn: ChatTurn, cap: usize) -> usize {
        self.history.push_back(turn);
        let mut dropped = 0;
        while self.history.len() > cap {
            self.history.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn context(&self) -> ChatContext {
        ChatContext {
            session_id: self.session_id,
            anchor: self.anchor.clone(),
            resume_text: self.resume_text.clone(),
            history: self.history.iter().cloned().collect(),
            created_at: self.created_at,
        }
    }
}

/// Snapshot of a session handed to the prompt builder and to API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatContext {
    pub session_id: SessionId,
    pub anchor: AnalysisResult,
    #[serde(skip_serializing)]
    pub resume_text: String,
    /// Oldest first.
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> AnalysisResult {
        AnalysisResult {
            score: 4.0,
            matched_skills: vec!["Python".into()],
            missing_skills: vec!["Docker".into()],
            advice: String::new(),
            recommended_roles: vec![],
            suggestions: vec![],
            ..Default::default()
        }
    }

    #[test]
    fn test_push_turn_drops_oldest_beyond_cap() {
        let mut session = Session::new(Uuid::new_v4(), "resume".into(), anchor());
        for i in 0..5 {
            session.push_turn(ChatTurn::new(Role::User, format!("m{i}")), 3);
        }
        let texts: Vec<_> = session.history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_push_turn_reports_dropped_count() {
        let mut session = Session::new(Uuid::new_v4(), "resume".into(), anchor());
        assert_eq!(session.push_turn(ChatTurn::new(Role::User, "a"), 1), 0);
        assert_eq!(session.push_turn(ChatTurn::new(Role::Assistant, "b"), 1), 1);
        assert_eq!(session.anchor, anchor());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_context_omits_resume_text_when_serialized() {
        let session = Session::new(Uuid::new_v4(), "secret resume".into(), anchor());
        let value = serde_json::to_value(session.context()).unwrap();
        assert!(value.get("resume_text").is_none());
        assert_eq!(value["anchor"]["score"], 4.0);
    }
}

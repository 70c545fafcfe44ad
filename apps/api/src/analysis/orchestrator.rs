//! Analysis Orchestrator: drives normalize → prompt → generate → validate.
//!
//! Flow (analysis): prepare inputs → build_analysis_prompt → generation call
//!       under timeout → validate → (retry on transient/malformed) → result.
//! Flow (chat):     normalize message → lock session → build_chat_prompt →
//!       generation call under timeout → append user + assistant turns if the
//!       session is still live.
//!
//! This is the ONLY place retry and backoff policy lives. The orchestrator
//! keeps no mutable state between calls; sessions are passed in.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::analysis::normalizer::{
    normalize, prepare, EmptyInput, InputField, InputLimits, PreparedInput,
};
use crate::analysis::prompt_builder::{
    build_analysis_prompt, build_chat_prompt, DEFAULT_CHAT_WINDOW,
};
use crate::analysis::validator::{validate, Classification, Coercion, ValidationError};
use crate::llm_client::{GenerationClient, GenerationConfig, GenerationError, Prompt};
use crate::session::models::{Role, SessionId};
use crate::session::{SessionError, SessionManager};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Exponential backoff: base, 2×base, 4×base … capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based). A server hint can only
    /// lengthen the delay, never past `max_delay`.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exp);
        backoff.max(hint.unwrap_or_default()).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    pub limits: InputLimits,
    pub retry: RetryPolicy,
    /// Per-attempt bound on the generation call.
    pub generation_timeout: Duration,
    /// Recent turns rendered into chat prompts.
    pub chat_window: usize,
    pub max_chat_message_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            limits: InputLimits::default(),
            retry: RetryPolicy::default(),
            generation_timeout: Duration::from_secs(60),
            chat_window: DEFAULT_CHAT_WINDOW,
            max_chat_message_chars: 2_000,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes and errors
// ────────────────────────────────────────────────────────────────────────────

/// An analysis together with the normalized input it was run on.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub input: PreparedInput,
    pub analysis: Analysis,
}

/// A validated analysis plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub classification: Classification,
    pub coercions: Vec<Coercion>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    pub session_id: SessionId,
    pub turn_count: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub session: SessionMeta,
}

/// Terminal failures that cross the orchestrator boundary.
/// Transient conditions never appear here unless retries were exhausted.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    EmptyInput(#[from] EmptyInput),

    #[error("generation failed after {attempts} attempt(s): {source}")]
    Generation {
        attempts: u32,
        source: GenerationError,
    },

    #[error("model output unusable after {attempts} attempt(s): {source}")]
    Validation {
        attempts: u32,
        source: ValidationError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Why a single attempt failed in a way that permits another attempt.
enum RetryableFailure {
    Generation(GenerationError),
    Validation(ValidationError),
}

impl RetryableFailure {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            RetryableFailure::Generation(e) => e.retry_after(),
            RetryableFailure::Validation(_) => None,
        }
    }

    fn into_error(self, attempts: u32) -> AnalysisError {
        match self {
            RetryableFailure::Generation(source) => AnalysisError::Generation { attempts, source },
            RetryableFailure::Validation(source) => AnalysisError::Validation { attempts, source },
        }
    }
}

impl std::fmt::Display for RetryableFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryableFailure::Generation(e) => write!(f, "{e}"),
            RetryableFailure::Validation(e) => write!(f, "{e}"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    /// Normalizes and budget-checks a raw request.
    pub fn prepare(&self, request: &AnalysisRequest) -> Result<PreparedInput, AnalysisError> {
        Ok(prepare(request, &self.config.limits)?)
    }

    /// Full pipeline for a raw request.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        let input = self.prepare(request)?;
        let analysis = self.analyze_prepared(&input).await?;
        Ok(AnalysisOutcome { input, analysis })
    }

    /// Generation + validation for already-prepared input.
    pub async fn analyze_prepared(&self, input: &PreparedInput) -> Result<Analysis, AnalysisError> {
        info!(
            "Analyzing resume ({} chars{}) against JD ({} chars{})",
            input.resume.char_len(),
            if input.resume.truncated { ", truncated" } else { "" },
            input.job_description.char_len(),
            if input.job_description.truncated { ", truncated" } else { "" },
        );

        let prompt = build_analysis_prompt(&input.resume.text, &input.job_description.text);
        let (validated, attempts) = self
            .generate_with_retry(&prompt, &GenerationConfig::structured(), |raw| {
                validate(&raw)
            })
            .await?;

        let analysis = Analysis {
            classification: validated.classification(),
            result: validated.result,
            coercions: validated.coercions,
            attempts,
        };
        if analysis.classification == Classification::Partial {
            info!(
                "Analysis accepted as PARTIAL after {} attempt(s); coercions: {:?}",
                attempts, analysis.coercions
            );
        } else {
            info!(
                "Analysis complete after {} attempt(s): score {:.1}",
                attempts, analysis.result.score
            );
        }
        Ok(analysis)
    }

    /// One coaching turn. Turns are committed only after a successful reply,
    /// so a failed or cancelled call leaves the session untouched. A session
    /// removed or expired while the reply was pending reports `NotFound`.
    pub async fn chat(
        &self,
        sessions: &SessionManager,
        session_id: SessionId,
        message: &str,
    ) -> Result<ChatReply, AnalysisError> {
        let message = normalize(message, self.config.max_chat_message_chars);
        if message.is_empty() {
            return Err(EmptyInput(InputField::ChatMessage).into());
        }

        // Held across the generation call: overlapping chats on one session queue here.
        let mut handle = sessions.acquire(session_id).await?;
        let context = handle.context();
        let prompt = build_chat_prompt(
            &context.anchor,
            &context.resume_text,
            &context.history,
            &message.text,
            self.config.chat_window,
        );

        let (reply, attempts) = self
            .generate_with_retry(&prompt, &GenerationConfig::conversational(), |raw| {
                let reply = raw.trim();
                if reply.is_empty() {
                    Err(ValidationError::Malformed("empty chat reply".into()))
                } else {
                    Ok(reply.to_string())
                }
            })
            .await?;

        sessions.append_turn(&mut handle, Role::User, message.text)?;
        sessions.append_turn(&mut handle, Role::Assistant, reply.clone())?;
        info!(
            "Chat turn committed to session {} after {} attempt(s)",
            handle.session_id(),
            attempts
        );

        Ok(ChatReply {
            reply,
            session: SessionMeta {
                session_id,
                turn_count: handle.turn_count(),
                score: handle.anchor().score,
            },
        })
    }

    /// Calls the generation service until `accept` yields a value, a terminal
    /// error occurs, or `1 + max_retries` attempts are spent.
    async fn generate_with_retry<T>(
        &self,
        prompt: &Prompt,
        generation: &GenerationConfig,
        mut accept: impl FnMut(String) -> Result<T, ValidationError>,
    ) -> Result<(T, u32), AnalysisError> {
        let max_attempts = self.config.retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.generate_once(prompt, generation).await {
                Ok(raw) => match accept(raw) {
                    Ok(value) => return Ok((value, attempt)),
                    Err(e) if e.is_retryable() => RetryableFailure::Validation(e),
                    Err(source) => {
                        warn!("Attempt {attempt}/{max_attempts}: terminal validation failure: {source}");
                        return Err(AnalysisError::Validation {
                            attempts: attempt,
                            source,
                        });
                    }
                },
                Err(e) if e.is_retryable() => RetryableFailure::Generation(e),
                Err(source) => {
                    warn!("Attempt {attempt}/{max_attempts}: terminal generation failure: {source}");
                    return Err(AnalysisError::Generation {
                        attempts: attempt,
                        source,
                    });
                }
            };

            if attempt >= max_attempts {
                warn!("Attempt {attempt}/{max_attempts} failed ({failure}); retries exhausted");
                return Err(failure.into_error(attempt));
            }

            let delay = self.config.retry.delay_for(attempt, failure.retry_after());
            warn!(
                "Attempt {}/{} failed ({}), retrying after {}ms...",
                attempt,
                max_attempts,
                failure,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One bounded call. Dropping the returned future drops the in-flight request.
    async fn generate_once(
        &self,
        prompt: &Prompt,
        generation: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        tokio::time::timeout(
            self.config.generation_timeout,
            self.client.generate(prompt, generation),
        )
        .await
        .unwrap_or(Err(GenerationError::Timeout))
    }
}

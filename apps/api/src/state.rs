use std::sync::Arc;

use crate::analysis::orchestrator::Orchestrator;
use crate::extraction::DocumentExtractor;
use crate::session::SessionManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Sole owner of live chat sessions.
    pub sessions: Arc<SessionManager>,
    /// Pluggable document extractor. Default: FileExtractor (PDF + plain text).
    pub extractor: Arc<dyn DocumentExtractor>,
}

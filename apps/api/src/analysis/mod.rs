// Analysis Orchestration: normalize → prompt → generate → validate, plus chat turns.
// All generation calls go through llm_client via the orchestrator; handlers never call it directly.

pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt_builder;
pub mod prompts;
pub mod validator;

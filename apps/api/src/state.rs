use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionClient;
use crate::noa::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Model handle built at startup. Tests swap in a scripted client.
    pub llm: Arc<dyn CompletionClient>,
    pub sessions: SessionStore,
    pub config: Config,
}

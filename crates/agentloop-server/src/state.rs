//! Application State

use std::sync::Arc;

use agentloop_runtime::AgentFactory;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Builds a fresh agent per chat request
    pub factory: Arc<AgentFactory>,
}

impl AppState {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }
}

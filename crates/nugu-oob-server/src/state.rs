//! Application state shared across handlers.

use std::sync::Arc;

use nugu_oob_oauth::{OAuthClient, SharedConfigStore};

use crate::config::ServerConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Registration and token documents.
    pub store: SharedConfigStore,

    /// Identity provider client.
    pub oauth: Arc<OAuthClient>,

    /// Browser sessions.
    pub sessions: SessionStore,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: ServerConfig, store: SharedConfigStore, oauth: OAuthClient) -> Self {
        Self {
            config: Arc::new(config),
            store,
            oauth: Arc::new(oauth),
            sessions: SessionStore::new(),
        }
    }
}

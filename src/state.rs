use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionStore;
use crate::store::{MemoryRecordStore, MemoryRepositoryEngine, RecordStore, RepositoryEngine};

/// State shared by every connection: configuration, the session store and
/// the collaborators. The session store is the only part mutated at runtime.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub repos: Arc<dyn RepositoryEngine>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        repos: Arc<dyn RepositoryEngine>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let sessions = SessionStore::new(config.auth.session_ttl());
        Self {
            config,
            sessions,
            repos,
            records,
        }
    }

    /// State backed by the in-memory collaborators.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryRepositoryEngine::new()),
            Arc::new(MemoryRecordStore::new()),
        )
    }
}

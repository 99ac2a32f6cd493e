//! Game session persistence.
//!
//! One `GameSession` per game code, behind an abstract key-value store.
//! Every operation carries a bounded timeout so a slow backend surfaces as
//! a retryable [`StoreError`] instead of hanging a connection. Per-code
//! write serialization is the orchestrator's job; the store only promises
//! that individual get/put/delete calls are atomic.

use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::RwLock, time::timeout};

use crate::game::GameSession;

/// Default bound on a single store operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from store operations. Both variants are transient from the
/// caller's point of view and safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Abstract key-value persistence for game sessions.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<GameSession>, StoreError>;
    async fn put(&self, session: GameSession) -> Result<(), StoreError>;
    async fn delete(&self, code: &str) -> Result<(), StoreError>;
}

/// In-memory store backend, the default for a single-process server.
pub struct MemoryStore {
    games: RwLock<HashMap<String, GameSession>>,
    op_timeout: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_OP_TIMEOUT)
    }

    pub fn with_timeout(op_timeout: Duration) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            op_timeout,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get(&self, code: &str) -> Result<Option<GameSession>, StoreError> {
        timeout(self.op_timeout, async {
            self.games.read().await.get(code).cloned()
        })
        .await
        .map_err(|_| StoreError::Timeout(self.op_timeout))
    }

    async fn put(&self, session: GameSession) -> Result<(), StoreError> {
        timeout(self.op_timeout, async {
            self.games
                .write()
                .await
                .insert(session.code.clone(), session);
        })
        .await
        .map_err(|_| StoreError::Timeout(self.op_timeout))
    }

    async fn delete(&self, code: &str) -> Result<(), StoreError> {
        timeout(self.op_timeout, async {
            if self.games.write().await.remove(code).is_some() {
                log::debug!("deleted game {code}");
            }
        })
        .await
        .map_err(|_| StoreError::Timeout(self.op_timeout))
    }
}

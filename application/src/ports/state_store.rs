//! Port for persisting and loading run state.
//!
//! Implementations must save atomically: a reader must never observe a
//! partially written state file (see the state store's write-then-rename
//! discipline in infrastructure).

use async_trait::async_trait;
use conduct_domain::{RunId, State};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("failed to read state for run {0}: {1}")]
    ReadFailed(String, String),
    #[error("failed to write state for run {0}: {1}")]
    WriteFailed(String, String),
    #[error("no saved state found for run {0}")]
    NotFound(String),
}

#[async_trait]
pub trait StateStorePort: Send + Sync {
    async fn save(&self, state: &State) -> Result<(), StateStoreError>;
    async fn load(&self, run_id: &RunId) -> Result<State, StateStoreError>;
    async fn exists(&self, run_id: &RunId) -> bool;
    /// Most recently saved state in this store, regardless of run id.
    /// Backs `resume`/`status`, which address a spec by name rather than
    /// the exact run id a past `run` invocation minted.
    async fn latest(&self) -> Result<State, StateStoreError>;
}

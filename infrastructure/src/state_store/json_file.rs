//! Persists [`State`] as one JSON file per run, written atomically.
//!
//! Follows the write-then-rename discipline the port doc comment requires,
//! with one file per run under a shared root directory rather than a
//! single file every run would contend for.

use async_trait::async_trait;
use conduct_application::ports::state_store::{StateStoreError, StateStorePort};
use conduct_domain::{RunId, State};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub struct JsonFileStateStore {
    root: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.root.join(format!("{}.json", run_id.as_str()))
    }

    /// Load the most recently saved state in this store's directory.
    ///
    /// Run ids end in a Unix-seconds timestamp (see
    /// [`conduct_domain::RunId::derive`]), so lexicographic filename order
    /// is chronological order; callers that only know a spec reference
    /// (not the exact run id a past `run` invocation picked) use this for
    /// `status`/`resume` rather than trying to reconstruct the id.
    pub async fn latest(&self) -> Result<State, StateStoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StateStoreError::NotFound(format!("{}: {e}", self.root.display())))?;

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stripped) = name.strip_suffix(".json") {
                    names.push(stripped.to_string());
                }
            }
        }
        names.sort();

        let run_id = names
            .into_iter()
            .next_back()
            .ok_or_else(|| StateStoreError::NotFound(self.root.display().to_string()))?;

        self.load(&RunId::new(run_id)).await
    }
}

#[async_trait]
impl StateStorePort for JsonFileStateStore {
    async fn save(&self, state: &State) -> Result<(), StateStoreError> {
        let run_id = state.run_id.as_str().to_string();
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StateStoreError::WriteFailed(run_id.clone(), e.to_string()))?;

        let final_path = self.path_for(&state.run_id);
        let tmp_path = final_path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StateStoreError::WriteFailed(run_id.clone(), e.to_string()))?;

        {
            let mut tmp_file = tokio::fs::File::create(&tmp_path)
                .await
                .map_err(|e| StateStoreError::WriteFailed(run_id.clone(), e.to_string()))?;
            tmp_file
                .write_all(&json)
                .await
                .map_err(|e| StateStoreError::WriteFailed(run_id.clone(), e.to_string()))?;
            // Flush to disk before the rename so a crash between the two
            // never leaves the rename target backed by unflushed pages.
            tmp_file
                .sync_all()
                .await
                .map_err(|e| StateStoreError::WriteFailed(run_id.clone(), e.to_string()))?;
        }

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| StateStoreError::WriteFailed(run_id, e.to_string()))?;

        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<State, StateStoreError> {
        let path = self.path_for(run_id);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateStoreError::NotFound(run_id.as_str().to_string())
            } else {
                StateStoreError::ReadFailed(run_id.as_str().to_string(), e.to_string())
            }
        })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| StateStoreError::ReadFailed(run_id.as_str().to_string(), e.to_string()))
    }

    async fn exists(&self, run_id: &RunId) -> bool {
        tokio_fs_exists(&self.path_for(run_id)).await
    }

    async fn latest(&self) -> Result<State, StateStoreError> {
        JsonFileStateStore::latest(self).await
    }
}

async fn tokio_fs_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduct_domain::ComponentId;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path());
        let run_id = RunId::new("demo-run-1");
        let state = State::new(run_id.clone(), "demo", vec![ComponentId::new("auth")]);

        store.save(&state).await.unwrap();
        assert!(store.exists(&run_id).await);

        let loaded = store.load(&run_id).await.unwrap();
        assert_eq!(loaded.manifest_name, "demo");
        assert!(loaded.component(&ComponentId::new("auth")).is_some());
    }

    #[tokio::test]
    async fn load_missing_run_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path());
        let err = store.load(&RunId::new("missing")).await.unwrap_err();
        assert!(matches!(err, StateStoreError::NotFound(_)));
    }
}

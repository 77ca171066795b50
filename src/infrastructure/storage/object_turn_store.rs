use std::path::PathBuf;
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};

use crate::application::ports::{TurnStore, TurnStoreError};

/// Conversation storage on top of an object store: a directory on the
/// device, or memory for ephemeral sessions.
pub struct ObjectTurnStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectTurnStore {
    pub fn local(base_path: PathBuf) -> Result<Self, TurnStoreError> {
        std::fs::create_dir_all(&base_path)?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| TurnStoreError::WriteFailed(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(fs),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    fn path_for(key: &str) -> StorePath {
        StorePath::from(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl TurnStore for ObjectTurnStore {
    async fn load(&self, key: &str) -> Result<Option<String>, TurnStoreError> {
        let result = match self.inner.get(&Self::path_for(key)).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(TurnStoreError::ReadFailed(e.to_string())),
        };

        let bytes = result
            .bytes()
            .await
            .map_err(|e| TurnStoreError::ReadFailed(e.to_string()))?;

        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), TurnStoreError> {
        self.inner
            .put(&Self::path_for(key), PutPayload::from(value.as_bytes().to_vec()))
            .await
            .map_err(|e| TurnStoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), TurnStoreError> {
        match self.inner.delete(&Self::path_for(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(TurnStoreError::DeleteFailed(e.to_string())),
        }
    }
}

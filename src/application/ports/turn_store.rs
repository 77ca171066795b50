use async_trait::async_trait;

/// Keyed on-device storage holding serialized conversation state.
#[async_trait]
pub trait TurnStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, TurnStoreError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), TurnStoreError>;

    async fn remove(&self, key: &str) -> Result<(), TurnStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TurnStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

// Repository trait for the persistence medium - opaque text under a fixed key
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Stored text for `key`, or `None` when nothing was ever saved
    async fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Overwrite the value stored under `key`
    async fn save(&self, key: &str, value: &str) -> StorageResult<()>;
}

//! Storage module
//!
//! Narrow interface over the two persisted entities: uploaded model files and
//! the settings document. Handlers only talk to [`ModelStore`], so the write
//! strategy (in-place or temp-file + rename) can change without touching them.
//! Model bodies are streamed through a [`ModelUpload`] rather than buffered.
//!
//! Writes are last-write-wins. No locking is performed; two concurrent writers
//! to the same name race and whichever finishes last is what remains on disk.

mod fs;

use async_trait::async_trait;
use hyper::body::Bytes;
use std::path::PathBuf;

pub use fs::{FsStore, FsUpload};

/// Errors raised by a [`ModelStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name would escape the upload directory
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a successful model upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModel {
    /// Where the bytes landed on disk
    pub disk_path: PathBuf,
    /// URL path the file is now reachable at through the static responder
    pub public_path: String,
}

/// A model file being received chunk by chunk
///
/// Nothing is visible under the final name until [`commit`](Self::commit)
/// succeeds when the store writes atomically. Dropping an upload without
/// committing discards whatever was written.
#[async_trait]
pub trait ModelUpload: Send {
    async fn write_chunk(&mut self, chunk: &[u8]) -> StoreResult<()>;

    /// Make the file available under its name
    async fn commit(self: Box<Self>) -> StoreResult<StoredModel>;
}

#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Validate `name` and start receiving the model file
    async fn begin_model(&self, name: &str) -> StoreResult<Box<dyn ModelUpload>>;

    /// Create or truncate the model file `name` with `data`
    async fn put_model(&self, name: &str, data: &[u8]) -> StoreResult<StoredModel> {
        let mut upload = self.begin_model(name).await?;
        upload.write_chunk(data).await?;
        upload.commit().await
    }

    /// Read back a model file, `None` if it does not exist
    async fn get_model(&self, name: &str) -> StoreResult<Option<Bytes>>;

    /// Replace the settings document
    async fn put_settings(&self, doc: &serde_json::Value) -> StoreResult<()>;

    /// Read the settings document, `None` if none was ever saved
    async fn get_settings(&self) -> StoreResult<Option<serde_json::Value>>;
}

/// Check a client-supplied file name.
///
/// Names are kept verbatim; only those that could resolve outside the upload
/// directory are refused.
pub fn validate_name(name: &str) -> StoreResult<&str> {
    let escapes = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if escapes {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Render a settings document the way it is stored on disk (2-space indent)
pub fn render_settings(doc: &serde_json::Value) -> StoreResult<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

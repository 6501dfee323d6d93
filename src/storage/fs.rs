//! Filesystem-backed store

use async_trait::async_trait;
use hyper::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{
    render_settings, validate_name, ModelStore, ModelUpload, StoreError, StoreResult, StoredModel,
};
use crate::config::StorageConfig;
use crate::logger;

/// Distinguishes temp files of concurrent writers within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store that keeps models in one directory and settings in one file
#[derive(Debug, Clone)]
pub struct FsStore {
    upload_dir: PathBuf,
    public_prefix: String,
    settings_file: PathBuf,
    atomic_writes: bool,
}

impl FsStore {
    pub fn new(upload_dir: impl Into<PathBuf>, settings_file: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_prefix: String::new(),
            settings_file: settings_file.into(),
            atomic_writes: true,
        }
    }

    pub fn from_config(cfg: &StorageConfig) -> Self {
        Self::new(&cfg.upload_dir, &cfg.settings_file)
            .with_public_prefix(&cfg.public_prefix)
            .with_atomic_writes(cfg.atomic_writes)
    }

    #[must_use]
    pub fn with_public_prefix(mut self, prefix: &str) -> Self {
        self.public_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic_writes = atomic;
        self
    }

    /// Create the upload directory and the settings file's parent if missing
    pub async fn ensure_dirs(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| StoreError::io(&self.upload_dir, e))?;
        if let Some(parent) = self.settings_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }
        Ok(())
    }

    /// URL path a stored model is served at
    pub fn public_path(&self, name: &str) -> String {
        if self.public_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.public_prefix)
        }
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> StoreResult<()> {
        if self.atomic_writes {
            write_atomic(path, data).await
        } else {
            fs::write(path, data)
                .await
                .map_err(|e| StoreError::io(path, e))
        }
    }
}

/// Write into a hidden sibling, then rename over `path`.
///
/// On failure the previous contents of `path` are left untouched.
async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let temp = temp_path_for(path);

    if let Err(e) = fs::write(&temp, data).await {
        discard_temp(&temp).await;
        return Err(StoreError::io(path, e));
    }

    if let Err(e) = fs::rename(&temp, path).await {
        discard_temp(&temp).await;
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

async fn discard_temp(temp: &Path) {
    match fs::remove_file(temp).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => logger::log_warning(&format!(
            "Failed to remove temporary file '{}': {e}",
            temp.display()
        )),
    }
}

/// Model file streamed to disk
///
/// In atomic mode bytes go to a hidden sibling that is renamed over the
/// target on commit; otherwise the target itself is truncated and written.
/// Whatever was staged is removed if the upload is dropped uncommitted.
#[derive(Debug)]
pub struct FsUpload {
    file: fs::File,
    staging: PathBuf,
    target: PathBuf,
    public_path: String,
    committed: bool,
}

impl Drop for FsUpload {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.staging) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => logger::log_warning(&format!(
                "Failed to remove partial upload '{}': {e}",
                self.staging.display()
            )),
        }
    }
}

#[async_trait]
impl ModelUpload for FsUpload {
    async fn write_chunk(&mut self, chunk: &[u8]) -> StoreResult<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| StoreError::io(&self.target, e))
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<StoredModel> {
        self.file
            .flush()
            .await
            .map_err(|e| StoreError::io(&self.target, e))?;
        if self.staging != self.target {
            fs::rename(&self.staging, &self.target)
                .await
                .map_err(|e| StoreError::io(&self.target, e))?;
        }
        self.committed = true;
        Ok(StoredModel {
            disk_path: self.target.clone(),
            public_path: self.public_path.clone(),
        })
    }
}

#[async_trait]
impl ModelStore for FsStore {
    async fn begin_model(&self, name: &str) -> StoreResult<Box<dyn ModelUpload>> {
        let name = validate_name(name)?;
        let target = self.upload_dir.join(name);
        let staging = if self.atomic_writes {
            temp_path_for(&target)
        } else {
            target.clone()
        };
        let file = fs::File::create(&staging)
            .await
            .map_err(|e| StoreError::io(&target, e))?;
        Ok(Box::new(FsUpload {
            file,
            staging,
            public_path: self.public_path(name),
            target,
            committed: false,
        }))
    }

    async fn get_model(&self, name: &str) -> StoreResult<Option<Bytes>> {
        let path = self.upload_dir.join(validate_name(name)?);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn put_settings(&self, doc: &serde_json::Value) -> StoreResult<()> {
        let text = render_settings(doc)?;
        self.write_file(&self.settings_file, text.as_bytes()).await
    }

    async fn get_settings(&self) -> StoreResult<Option<serde_json::Value>> {
        match fs::read(&self.settings_file).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.settings_file, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &Path) -> FsStore {
        FsStore::new(dir.join("models"), dir.join("settings.json"))
    }

    #[tokio::test]
    async fn test_put_and_get_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().await.unwrap();

        let stored = store.put_model("model.bin", b"\x00\x01weights").await.unwrap();
        assert_eq!(stored.public_path, "model.bin");
        assert_eq!(stored.disk_path, dir.path().join("models/model.bin"));

        let data = store.get_model("model.bin").await.unwrap().unwrap();
        assert_eq!(&data[..], b"\x00\x01weights");
        assert!(store.get_model("missing.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_public_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path()).with_public_prefix("/models/");
        store.ensure_dirs().await.unwrap();

        let stored = store.put_model("weights-v2.onnx", b"x").await.unwrap();
        assert_eq!(stored.public_path, "/models/weights-v2.onnx");
    }

    #[tokio::test]
    async fn test_model_overwrite_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        for atomic in [true, false] {
            let store = store_in(dir.path()).with_atomic_writes(atomic);
            store.ensure_dirs().await.unwrap();

            store.put_model("m.bin", b"first version, longer").await.unwrap();
            store.put_model("m.bin", b"second").await.unwrap();
            let data = store.get_model("m.bin").await.unwrap().unwrap();
            assert_eq!(&data[..], b"second");
        }
    }

    #[tokio::test]
    async fn test_invalid_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().await.unwrap();

        let err = store.put_model("../escape.bin", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
        assert!(!dir.path().join("escape.bin").exists());
    }

    #[tokio::test]
    async fn test_settings_replace_not_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.get_settings().await.unwrap().is_none());

        store.put_settings(&json!({"a": 1, "keep": true})).await.unwrap();
        store.put_settings(&json!({"b": "x"})).await.unwrap();

        assert_eq!(store.get_settings().await.unwrap(), Some(json!({"b": "x"})));
        let text = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert_eq!(text, "{\n  \"b\": \"x\"\n}");
    }

    #[tokio::test]
    async fn test_failed_atomic_write_keeps_previous_target() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the settings file should be makes the rename fail
        let target = dir.path().join("settings.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"untouched").unwrap();

        let store = FsStore::new(dir.path(), &target);
        let err = store.put_settings(&json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        assert!(target.is_dir());
        assert_eq!(std::fs::read(target.join("keep")).unwrap(), b"untouched");
        // No stray temp files left next to the target
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_streamed_upload_visible_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().await.unwrap();
        store.put_model("m.bin", b"previous").await.unwrap();

        let mut upload = store.begin_model("m.bin").await.unwrap();
        upload.write_chunk(b"first ").await.unwrap();
        upload.write_chunk(b"second").await.unwrap();
        let data = store.get_model("m.bin").await.unwrap().unwrap();
        assert_eq!(&data[..], b"previous");

        let stored = upload.commit().await.unwrap();
        assert_eq!(stored.disk_path, dir.path().join("models/m.bin"));
        let data = store.get_model("m.bin").await.unwrap().unwrap();
        assert_eq!(&data[..], b"first second");
    }

    #[tokio::test]
    async fn test_dropped_upload_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        for atomic in [true, false] {
            let store = store_in(dir.path()).with_atomic_writes(atomic);
            store.ensure_dirs().await.unwrap();

            let mut upload = store.begin_model("partial.bin").await.unwrap();
            upload.write_chunk(b"half a model").await.unwrap();
            drop(upload);

            let entries: Vec<_> = std::fs::read_dir(dir.path().join("models"))
                .unwrap()
                .collect();
            assert!(entries.is_empty(), "atomic={atomic}");
        }
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("nope"), dir.path().join("nope/s.json"));
        assert!(store.put_model("a.bin", b"x").await.is_err());
        assert!(store.put_settings(&json!({})).await.is_err());
    }
}

//! Upload storage: one flat directory holding every upload and the single
//! output file.
//!
//! There is no manifest, versioning or cleanup. Uploads are written under
//! their sanitized names and kept; the output file is replaced on every
//! successful submission. Concurrent submissions are last-write-wins.

use crate::config::ServiceConfig;
use crate::error::AppError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Handle on the storage directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    output_file_name: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, output_file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            output_file_name: output_file_name.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.storage_dir, &config.output_file_name)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn output_file_name(&self) -> &str {
        &self.output_file_name
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.output_file_name)
    }

    /// Create the storage directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage {
                path: self.dir.clone(),
                source: e,
            })
    }

    /// Write an upload under `file_name`, which must already be sanitized.
    pub async fn save_upload(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, AppError> {
        self.ensure_dir().await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::Storage {
                path: path.clone(),
                source: e,
            })?;
        debug!("Stored upload {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    /// Replace the output file.
    ///
    /// The text goes to a uniquely named temp file in the storage directory
    /// and is then renamed over the old output. Concurrent writers never share
    /// a temp file; a download sees one complete report or another.
    pub async fn write_output(&self, text: &str) -> Result<PathBuf, AppError> {
        self.ensure_dir().await?;
        let dir = self.dir.clone();
        let path = self.output_path();
        let target = path.clone();
        let contents = text.to_owned();

        tokio::task::spawn_blocking(move || persist_atomically(&dir, &target, contents.as_bytes()))
            .await
            .map_err(|e| AppError::Internal(format!("output writer task: {}", e)))??;

        debug!("Wrote output {} ({} bytes)", path.display(), text.len());
        Ok(path)
    }

    /// Read the current output.
    ///
    /// # Errors
    /// [`AppError::OutputMissing`] if nothing has been written yet.
    pub async fn read_output(&self) -> Result<Vec<u8>, AppError> {
        let path = self.output_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::OutputMissing { path })
            }
            Err(e) => Err(AppError::Storage { path, source: e }),
        }
    }
}

/// Write `bytes` to a fresh temp file in `dir`, then rename it to `path`.
fn persist_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let storage_err = |source: std::io::Error| AppError::Storage {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn read_before_write_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), "output.txt");
        let err = store.read_output().await.unwrap_err();
        assert!(matches!(err, AppError::OutputMissing { .. }));
    }

    #[tokio::test]
    async fn output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), "output.txt");

        store.write_output("first report").await.unwrap();
        store.write_output("second").await.unwrap();

        assert_eq!(store.read_output().await.unwrap(), b"second");
        // No temp file left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("output.txt")]);
    }

    #[tokio::test]
    async fn save_upload_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("nested/uploads"), "output.txt");

        let path = store.save_upload("spec.pdf", b"%PDF-1.7").await.unwrap();
        assert_eq!(path, dir.path().join("nested/uploads/spec.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_all_succeed_and_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(UploadStore::new(dir.path(), "output.txt"));
        let reports: Vec<String> = (0..8u8)
            .map(|i| char::from(b'a' + i).to_string().repeat(200_000))
            .collect();

        for _ in 0..10 {
            let handles: Vec<_> = reports
                .iter()
                .cloned()
                .map(|report| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { store.write_output(&report).await })
                })
                .collect();

            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let output = String::from_utf8(store.read_output().await.unwrap()).unwrap();
            assert!(reports.contains(&output), "output is a mix of reports");
        }

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}

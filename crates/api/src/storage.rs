//! On-disk media storage: uploaded inputs and engine outputs.
//!
//! Uploads are stored flat in the upload directory as
//! `{upload_id}_{sanitized name}` and found again by id prefix. Outputs live
//! in the output directory as `{job_id}_output.mp4`.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use faceswap_core::error::CoreError;
use faceswap_core::naming::{self, MediaKind};
use faceswap_core::types::new_id;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// A successfully stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub file_id: String,
    /// Sanitized original filename.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct MediaStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    max_upload_bytes: u64,
}

impl MediaStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            max_upload_bytes: config.max_upload_bytes(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they do not exist yet.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Validate and stream one upload to disk.
    ///
    /// The extension is checked before any byte is written; the size ceiling
    /// is enforced while streaming and a rejected file is removed.
    pub async fn save_upload<S, E>(
        &self,
        kind: MediaKind,
        original_name: &str,
        chunks: S,
    ) -> AppResult<StoredUpload>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<AppError>,
    {
        let filename = naming::sanitize_filename(original_name);
        naming::validate_extension(&filename, kind)?;

        let file_id = new_id();
        let path = self
            .upload_dir
            .join(naming::stored_upload_name(&file_id, &filename));

        match self.write_capped(&path, chunks).await {
            Ok(size) => {
                tracing::info!(
                    file_id = %file_id,
                    filename = %filename,
                    size,
                    kind = kind.label(),
                    "Upload stored"
                );
                Ok(StoredUpload {
                    file_id,
                    filename,
                    size,
                    path,
                })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn write_capped<S, E>(&self, path: &Path, chunks: S) -> AppResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<AppError>,
    {
        let mut file = tokio::fs::File::create(path).await?;
        let mut size: u64 = 0;

        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::into)?;
            size += chunk.len() as u64;
            naming::validate_size(size, self.max_upload_bytes)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(size)
    }

    /// Path of the stored upload with id `upload_id`, if any.
    pub async fn resolve_upload(&self, upload_id: &str) -> AppResult<Option<PathBuf>> {
        if !naming::is_valid_upload_id(upload_id) {
            return Ok(None);
        }
        let prefix = format!("{upload_id}_");

        let mut entries = match tokio::fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// Resolve a download request strictly inside the output directory.
    ///
    /// Fails with `NotFound` when no such file exists and `Forbidden` when the
    /// name resolves outside the output directory.
    pub async fn resolve_download(&self, filename: &str) -> Result<PathBuf, CoreError> {
        let safe = naming::sanitize_filename(filename);
        if safe.is_empty() {
            return Err(CoreError::not_found("File", filename));
        }

        let root = tokio::fs::canonicalize(&self.output_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("Output directory unavailable: {e}")))?;
        let resolved = match tokio::fs::canonicalize(self.output_dir.join(&safe)).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::not_found("File", &safe));
            }
            Err(e) => return Err(CoreError::Internal(e.to_string())),
        };

        if !resolved.starts_with(&root) {
            tracing::warn!(filename = %filename, "Download outside the output directory refused");
            return Err(CoreError::Forbidden("Access denied".to_string()));
        }
        if !tokio::fs::metadata(&resolved)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(CoreError::not_found("File", &safe));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::stream;

    use super::*;

    fn storage_in(dir: &Path, max_upload_size_mb: u64) -> MediaStorage {
        MediaStorage::new(&StorageConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("outputs"),
            max_upload_size_mb,
            job_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        })
    }

    fn chunks(parts: Vec<Bytes>) -> impl Stream<Item = Result<Bytes, AppError>> {
        stream::iter(parts.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn upload_is_stored_under_its_id_and_resolvable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = storage_in(dir.path(), 1);
        storage.ensure_dirs().await.expect("dirs");

        let stored = storage
            .save_upload(
                MediaKind::Image,
                "../my face!.JPG",
                chunks(vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")]),
            )
            .await
            .expect("upload");

        assert_eq!(stored.filename, "my face.JPG");
        assert_eq!(stored.size, 6);
        let resolved = storage
            .resolve_upload(&stored.file_id)
            .await
            .expect("resolve")
            .expect("present");
        assert_eq!(resolved, stored.path);
        assert_eq!(std::fs::read(resolved).expect("read"), b"abcdef");
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_before_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = storage_in(dir.path(), 1);
        storage.ensure_dirs().await.expect("dirs");

        let err = storage
            .save_upload(MediaKind::Video, "clip.exe", chunks(vec![Bytes::from_static(b"MZ")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Core(CoreError::Validation(_))));
        let count = std::fs::read_dir(storage.upload_dir()).expect("dir").count();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_removed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = storage_in(dir.path(), 1);
        storage.ensure_dirs().await.expect("dirs");
        let megabyte = Bytes::from(vec![0u8; 1024 * 1024]);

        let err = storage
            .save_upload(
                MediaKind::Video,
                "clip.mp4",
                chunks(vec![megabyte, Bytes::from_static(b"x")]),
            )
            .await
            .unwrap_err();

        let AppError::Core(CoreError::Validation(msg)) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(msg.contains("1MB"));
        let count = std::fs::read_dir(storage.upload_dir()).expect("dir").count();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn non_uuid_upload_ids_never_resolve() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = storage_in(dir.path(), 1);
        storage.ensure_dirs().await.expect("dirs");
        std::fs::write(storage.upload_dir().join("abc_face.jpg"), b"x").expect("write");

        assert!(storage.resolve_upload("abc").await.expect("resolve").is_none());
        assert!(storage.resolve_upload("*").await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn download_resolution_stays_inside_output_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = storage_in(dir.path(), 1);
        storage.ensure_dirs().await.expect("dirs");
        let output = storage.output_dir().join("job-1_output.mp4");
        std::fs::write(&output, b"video").expect("write output");

        let resolved = storage
            .resolve_download("job-1_output.mp4")
            .await
            .expect("resolve");
        assert_eq!(resolved, std::fs::canonicalize(&output).expect("canonical"));

        assert!(matches!(
            storage.resolve_download("missing.mp4").await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            storage.resolve_download("..").await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            storage.resolve_download("../uploads/secret.jpg").await,
            Err(CoreError::NotFound { .. })
        ));
    }
}

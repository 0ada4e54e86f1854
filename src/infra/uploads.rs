//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Directory (relative to the storage root) that receives every image.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Path relative to the storage root, e.g. `uploads/<uuid>-cover.png`.
    pub stored_path: String,
    pub size_bytes: u64,
}

/// Filesystem-backed upload storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(root.join(UPLOAD_PREFIX))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream a payload to disk under a fresh name and return its relative path.
    ///
    /// A partially written file is removed when the stream fails or turns out empty.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        stream: S,
    ) -> Result<StoredUpload, UploadStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        let stored_path = build_stored_path(original_name, content_type);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        let mut total_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            if chunk.is_empty() {
                continue;
            }

            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(UploadStorageError::SizeOverflow)?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        if total_bytes == 0 {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(UploadStorageError::EmptyPayload);
        }

        Ok(StoredUpload {
            stored_path,
            size_bytes: total_bytes,
        })
    }

    /// Store a fully-buffered payload.
    pub async fn store(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        let stream = stream::once(async move { Ok::<_, UploadStorageError>(data) });
        self.store_stream(original_name, content_type, stream).await
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    /// Obtain the absolute filesystem path for a stored upload.
    pub fn absolute_path(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        self.resolve(stored_path)
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str, content_type: Option<&str>) -> String {
    let identifier = Uuid::new_v4();
    let filename = sanitize_filename(original_name, content_type);
    format!("{UPLOAD_PREFIX}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str, content_type: Option<&str>) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .or_else(|| extension_for(content_type?));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn extension_for(content_type: &str) -> Option<String> {
    mime_guess::get_mime_extensions_str(content_type)
        .and_then(|extensions| extensions.first())
        .map(|ext| (*ext).to_string())
}

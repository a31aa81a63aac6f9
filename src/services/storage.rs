use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;

const MATERIALS_DIR: &str = "materials";
const MAX_FILE_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("invalid relative path")]
    InvalidRelativePath,
    #[error("path escapes media root")]
    PathOutsideRoot,
    #[error("file not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub(crate) struct StoredFile {
    /// Path relative to the media root, e.g. `materials/<uuid>_notes.pdf`.
    pub(crate) path: String,
    pub(crate) size: usize,
    pub(crate) sha256: String,
}

/// Uploaded material files on the local filesystem under `MEDIA_ROOT`.
#[derive(Debug, Clone)]
pub(crate) struct MediaStorage {
    root: PathBuf,
    media_url: String,
}

impl MediaStorage {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let storage = settings.storage();
        Ok(Self::open(&storage.media_root, &storage.media_url).await?)
    }

    pub(crate) async fn open(root: &Path, media_url: &str) -> Result<Self, StorageError> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        tokio::fs::create_dir_all(root.join(MATERIALS_DIR)).await?;
        let root = tokio::fs::canonicalize(root).await?;

        Ok(Self { root, media_url: media_url.trim_end_matches('/').to_string() })
    }

    pub(crate) fn public_url(&self, relative: &str) -> String {
        format!("{}/{}", self.media_url, relative)
    }

    pub(crate) async fn save_material(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let file_name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(original_name));
        let relative = format!("{MATERIALS_DIR}/{file_name}");

        tokio::fs::write(self.root.join(&relative), bytes).await?;

        Ok(StoredFile {
            path: relative,
            size: bytes.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
        })
    }

    pub(crate) async fn read(&self, relative: &str) -> Result<(Vec<u8>, &'static str), StorageError> {
        let path = self.resolve_existing(relative).await?;
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, guess_mime(&path)))
    }

    /// Removing a file that is already gone is not an error.
    pub(crate) async fn remove(&self, relative: &str) -> Result<(), StorageError> {
        let path = match self.resolve_existing(relative).await {
            Ok(path) => path,
            Err(StorageError::NotFound) => return Ok(()),
            Err(error) => return Err(error),
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn resolve_existing(&self, raw_relative: &str) -> Result<PathBuf, StorageError> {
        let relative = sanitize_relative_path(raw_relative)?;
        let canonical = match tokio::fs::canonicalize(self.root.join(relative)).await {
            Ok(path) => path,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound);
            }
            Err(error) => return Err(error.into()),
        };
        if !canonical.starts_with(&self.root) {
            return Err(StorageError::PathOutsideRoot);
        }
        if !canonical.is_file() {
            return Err(StorageError::NotFound);
        }
        Ok(canonical)
    }
}

pub(crate) fn sanitize_relative_path(raw: &str) -> Result<PathBuf, StorageError> {
    let normalized = raw.trim().replace('\\', "/").trim_start_matches('/').to_string();
    if normalized.is_empty() {
        return Err(StorageError::InvalidRelativePath);
    }

    let path = Path::new(&normalized);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidRelativePath);
            }
        }
    }

    Ok(path.to_path_buf())
}

/// Keeps the last path segment of a client file name, restricted to `[A-Za-z0-9._-]`.
pub(crate) fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') { ch } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "upload".to_string();
    }

    if cleaned.len() <= MAX_FILE_NAME_LEN {
        return cleaned.to_string();
    }
    // Keep the extension when truncating.
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= 10 => {
            let extension = &cleaned[dot..];
            format!("{}{}", &cleaned[..MAX_FILE_NAME_LEN - extension.len()], extension)
        }
        _ => cleaned[..MAX_FILE_NAME_LEN].to_string(),
    }
}

pub(crate) fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

//! On-disk storage for note attachments
//!
//! Each file lives at `{root}/{owner}/{audio|images}/{id}.{ext}`. The part
//! after the root is the attachment key; it is what the database stores and
//! what the `/data/uploads` static route serves.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::AttachmentKind;

/// URL path under which attachment keys are served
pub const UPLOADS_URL_PREFIX: &str = "/data/uploads";

/// Errors raised by attachment storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid attachment key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A file that was written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub key: String,
}

/// Manages attachment files below a root directory
#[derive(Debug, Clone)]
pub struct AttachmentStorage {
    root: PathBuf,
}

impl AttachmentStorage {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("Attachment storage directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a key; keys that would leave the root are rejected
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Write `bytes` as a new attachment of `owner`
    pub async fn store(
        &self,
        owner: Uuid,
        kind: AttachmentKind,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StorageResult<StoredFile> {
        let id = Uuid::new_v4();
        let key = format!(
            "{}/{}/{}.{}",
            owner,
            kind.directory(),
            id,
            extension_for(file_name, content_type)
        );

        let path = self.path_for(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        info!("Stored {} ({} bytes)", key, bytes.len());
        Ok(StoredFile { id, key })
    }

    pub async fn open(&self, key: &str) -> StorageResult<fs::File> {
        let path = self.path_for(key)?;
        Ok(fs::File::open(path).await?)
    }

    /// Delete one file; a file that is already gone is not an error
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted attachment {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Attachment {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every file in `keys`, logging failures and carrying on
    ///
    /// Returns the number of keys that were removed or already absent.
    pub async fn remove_all<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut removed = 0;
        for key in keys {
            let key = key.as_ref();
            match self.remove(key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to delete attachment {}: {}", key, e),
            }
        }
        removed
    }

    /// Remove the whole directory of `owner`, best-effort
    pub async fn purge_owner(&self, owner: Uuid) {
        let dir = self.root.join(owner.to_string());
        match fs::remove_dir_all(&dir).await {
            Ok(()) => info!("Removed attachment directory of {}", owner),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }
}

/// Public URL of `key` relative to `base` (`http://host:port`)
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}{}/{}", base.trim_end_matches('/'), UPLOADS_URL_PREFIX, key)
}

/// Resolve an attachment URL, key or bare id to the attachment id
///
/// Takes the last path segment, drops any query and extension, and parses
/// what is left as a UUID.
pub fn attachment_id_from_reference(reference: &str) -> Option<Uuid> {
    let reference = reference.split(['?', '#']).next().unwrap_or_default();
    let segment = reference.trim_end_matches('/').rsplit('/').next()?;
    let stem = segment.split('.').next()?;
    Uuid::parse_str(stem).ok()
}

/// File extension for a stored upload
///
/// Prefers the extension of the uploaded file name, then the content type,
/// then `bin`.
pub fn extension_for(file_name: &str, content_type: &str) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext.to_ascii_lowercase();
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let ext = match essence.as_str() {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    };
    ext.to_string()
}

//! Image upload: a filesystem-backed `ImageStore` plus the key/validation rules around it.

use cmspipe_core::{Error, ImageStore, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use crate::config::env;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_STORE_DIR: &str = "uploads-store";

pub(crate) fn store_dir_from_env() -> PathBuf {
    env("CMSPIPE_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR))
}

/// Best-effort magic-byte sniffing for the formats a CMS will accept as a cover image.
pub fn sniff_image_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(b"\xff\xd8\xff") {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    None
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// `uploads/{epoch_ms}-{name}`; keys are unique per millisecond and file name.
pub fn upload_key(file_name: &str, epoch_ms: i64) -> String {
    format!("uploads/{epoch_ms}-{}", sanitize_file_name(file_name))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
}

/// Validate, key and store one image.
pub async fn upload_image(
    store: &dyn ImageStore,
    file_name: &str,
    bytes: &[u8],
) -> Result<UploadedImage> {
    if bytes.is_empty() {
        return Err(Error::Upload("no file uploaded".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(Error::Upload(format!(
            "file is {} bytes; limit is {MAX_UPLOAD_BYTES}",
            bytes.len()
        )));
    }
    let content_type = sniff_image_content_type(bytes).unwrap_or("application/octet-stream");

    let key = upload_key(file_name, chrono::Utc::now().timestamp_millis());
    let url = store.put(&key, bytes, content_type).await?;
    tracing::info!(key = %key, bytes = bytes.len(), content_type, "stored image");
    Ok(UploadedImage {
        url,
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
    })
}

/// Writes objects under a root directory and addresses them below a public base URL.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsImageStore {
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into(),
        }
    }

    /// `CMSPIPE_STORE_DIR` / `CMSPIPE_PUBLIC_BASE_URL`. Without a base URL the objects are
    /// addressed as `file://` URLs of the (absolute) store directory.
    pub fn from_env() -> Result<Self> {
        let root = store_dir_from_env();
        let public_base_url = match env("CMSPIPE_PUBLIC_BASE_URL") {
            Some(u) => u,
            None => file_base_url(&root)?,
        };
        Ok(Self::new(root, public_base_url))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::Upload(format!("unsafe object key: {key:?}")));
        }
        Ok(self.root.join(rel))
    }
}

fn file_base_url(root: &Path) -> Result<String> {
    let abs = std::path::absolute(root)
        .map_err(|e| Error::NotConfigured(format!("store dir {}: {e}", root.display())))?;
    let url = url::Url::from_directory_path(&abs).map_err(|_| {
        Error::NotConfigured(format!("store dir {} is not addressable", abs.display()))
    })?;
    Ok(url.to_string())
}

#[async_trait::async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Upload(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", path.display())))?;
        Ok(self.public_url(key))
    }
}

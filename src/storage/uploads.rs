//! File storage backing the HTTP upload endpoint

use chrono::Utc;
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{HubError, Result};

const FALLBACK_FILE_NAME: &str = "file";

/// A file accepted by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub file_name: String,
    pub url: String,
}

/// Directory of uploaded files plus the public URL they are served under
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_base_url: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an uploaded file as `<millis>_<sanitized name>` and return its public URL
    pub async fn save(&self, original_name: Option<&str>, data: &[u8]) -> Result<StoredUpload> {
        if data.is_empty() {
            return Err(HubError::UploadError("No file uploaded".to_string()));
        }

        fs::create_dir_all(&self.dir).await?;

        let file_name = format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(original_name.unwrap_or(FALLBACK_FILE_NAME))
        );
        fs::write(self.dir.join(&file_name), data).await?;

        info!("Stored upload {} ({} bytes)", file_name, data.len());
        Ok(StoredUpload {
            url: format!("{}/uploads/{}", self.public_base_url, file_name),
            file_name,
        })
    }
}

/// Reduce a client-supplied file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\my file.png"), "my_file.png");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[tokio::test]
    async fn test_save_returns_public_url() {
        let scratch = tempdir().unwrap();
        let dir = scratch.path().join("uploads");
        let store = UploadStore::new(&dir, "http://localhost:3001");

        let stored = store.save(Some("cat.png"), b"meow").await.unwrap();

        assert!(stored.file_name.ends_with("_cat.png"));
        assert_eq!(
            stored.url,
            format!("http://localhost:3001/uploads/{}", stored.file_name)
        );
        assert_eq!(fs::read(dir.join(&stored.file_name)).await.unwrap(), b"meow");
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let scratch = tempdir().unwrap();
        let store = UploadStore::new(scratch.path(), "http://localhost");
        let result = store.save(Some("empty.txt"), b"").await;
        assert!(matches!(result, Err(HubError::UploadError(_))));
        assert!(!scratch.path().read_dir().unwrap().any(|_| true));
    }
}

//! Durable storage for binary chat payloads
//!
//! Every payload gets its own file. The name combines a UTC timestamp, the
//! origin connection id, and a process-wide sequence number, and files are
//! opened with create-new semantics, so two messages can never share or
//! interleave in one destination.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::connection::ConnectionId;
use crate::error::{HubError, Result};

/// Where a payload was written and how much of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReceipt {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Sink receiving every binary payload relayed by the hub
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Write `data` in full to a destination unique to this message
    async fn store(&self, origin: &ConnectionId, data: &[u8]) -> Result<MediaReceipt>;
}

/// Media sink writing one file per payload into a directory
pub struct FileMediaSink {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl FileMediaSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_destination(&self, origin: &ConnectionId) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        self.dir
            .join(format!("{}-{}-{:08}.bin", timestamp, origin, seq))
    }

    async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl MediaSink for FileMediaSink {
    async fn store(&self, origin: &ConnectionId, data: &[u8]) -> Result<MediaReceipt> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            HubError::StorageWriteFailed(format!(
                "cannot create media directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.next_destination(origin);
        if let Err(e) = Self::write_new(&path, data).await {
            error!("Failed to write media file {}: {}", path.display(), e);
            // Do not leave a truncated payload behind
            let _ = fs::remove_file(&path).await;
            return Err(HubError::StorageWriteFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        debug!("Stored {} bytes from {} at {}", data.len(), origin, path.display());
        Ok(MediaReceipt {
            path,
            bytes: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_writes_full_payload() {
        let scratch = tempdir().unwrap();
        let dir = scratch.path().join("media");
        let sink = FileMediaSink::new(&dir);
        let origin = ConnectionId::new();

        let receipt = sink.store(&origin, b"picture bytes").await.unwrap();

        assert_eq!(receipt.bytes, 13);
        assert!(receipt.path.starts_with(&dir));
        assert!(receipt
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains(origin.as_str()));
        assert_eq!(fs::read(&receipt.path).await.unwrap(), b"picture bytes");
    }

    #[tokio::test]
    async fn test_concurrent_stores_never_share_a_destination() {
        let scratch = tempdir().unwrap();
        let sink = Arc::new(FileMediaSink::new(scratch.path()));
        let origins = [ConnectionId::new(), ConnectionId::new()];

        let mut handles = Vec::new();
        for i in 0..20u8 {
            let sink = sink.clone();
            let origin = origins[(i % 2) as usize].clone();
            handles.push(tokio::spawn(async move {
                sink.store(&origin, &vec![i; 1024]).await.unwrap()
            }));
        }

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            let receipt = handle.await.unwrap();
            let data = fs::read(&receipt.path).await.unwrap();
            // each file holds exactly one payload
            assert_eq!(data.len(), 1024);
            assert!(data.iter().all(|b| *b == data[0]));
            paths.insert(receipt.path);
        }
        assert_eq!(paths.len(), 20);
    }

    #[tokio::test]
    async fn test_unwritable_directory_reports_storage_error() {
        let scratch = tempdir().unwrap();
        let blocker = scratch.path().join("blocker");
        fs::write(&blocker, b"not a directory").await.unwrap();
        let sink = FileMediaSink::new(blocker.join("nested"));

        let result = sink.store(&ConnectionId::new(), b"data").await;

        assert!(matches!(result, Err(HubError::StorageWriteFailed(_))));
    }
}

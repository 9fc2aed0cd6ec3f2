//! Storage mechanisms for persisting binary payloads and uploaded files

pub mod media;
pub mod uploads;

// Re-export the storage entry points
pub use media::{FileMediaSink, MediaReceipt, MediaSink};
pub use uploads::UploadStore;

//! S3-compatible object storage for frame and tile artifacts.
//!
//! Frame images live at `{video_id}/frame_{index:04}.jpg`; transient
//! region tiles live under a per-invocation prefix chosen by the caller.

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};

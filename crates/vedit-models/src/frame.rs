//! Video identity and frame metadata models.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an ingested video, minted at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata record for one extracted frame.
///
/// Created once by the extraction pipeline and immutable afterward.
/// `(video_id, frame_index)` is unique per store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Video this frame belongs to
    pub video_id: VideoId,
    /// 1-based position in decode order, strictly increasing per video
    pub frame_index: u32,
    /// Capture position within the source video, non-decreasing
    pub timestamp_millis: u64,
    /// Object-storage key of the stored frame image
    pub object_path: String,
}

/// Deterministic object-storage key for a frame image.
pub fn frame_object_key(video_id: &VideoId, frame_index: u32) -> String {
    format!("{}/frame_{:04}.jpg", video_id, frame_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_ids_are_unique() {
        assert_ne!(VideoId::new(), VideoId::new());
    }

    #[test]
    fn test_frame_object_key_is_zero_padded() {
        let id = VideoId::from("abc");
        assert_eq!(frame_object_key(&id, 7), "abc/frame_0007.jpg");
        assert_eq!(frame_object_key(&id, 12345), "abc/frame_12345.jpg");
    }
}

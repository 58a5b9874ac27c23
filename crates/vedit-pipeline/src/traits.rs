//! Collaborator interfaces consumed by the pipeline.
//!
//! The concrete clients are constructed once at the process boundary and
//! passed in as explicit handles; the stages only see these traits, which
//! also gives the tests a seam for in-memory fakes.

use async_trait::async_trait;

use vedit_genai::{GenAiError, GenerateRequest, ModelResponse};
use vedit_models::{Frame, VideoId};
use vedit_storage::StorageError;
use vedit_store::StoreError;

/// Path-addressed byte storage for frame and tile artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_bytes(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Canonical URI for a stored object, usable as a model file reference.
    fn object_uri(&self, key: &str) -> String;
}

/// Frame metadata persistence and range retrieval.
#[async_trait]
pub trait FrameRepo: Send + Sync {
    async fn insert_frame(&self, frame: &Frame) -> Result<(), StoreError>;

    /// Frames in `[start_millis, end_millis]` (inclusive), frame_index
    /// ascending.
    async fn frames_between(
        &self,
        video_id: &VideoId,
        start_millis: u64,
        end_millis: u64,
    ) -> Result<Vec<Frame>, StoreError>;
}

/// Generative multimodal model service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, GenAiError>;
}

#[async_trait]
impl ObjectStore for vedit_storage::StorageClient {
    async fn put_bytes(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        // Inherent methods win name resolution, so these delegate rather
        // than recurse.
        vedit_storage::StorageClient::put_bytes(self, key, data, content_type).await
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        vedit_storage::StorageClient::get_bytes(self, key).await
    }

    fn object_uri(&self, key: &str) -> String {
        vedit_storage::StorageClient::object_uri(self, key)
    }
}

#[async_trait]
impl FrameRepo for vedit_store::FrameStore {
    async fn insert_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        vedit_store::FrameStore::insert_frame(self, frame).await
    }

    async fn frames_between(
        &self,
        video_id: &VideoId,
        start_millis: u64,
        end_millis: u64,
    ) -> Result<Vec<Frame>, StoreError> {
        vedit_store::FrameStore::frames_between(self, video_id, start_millis, end_millis).await
    }
}

#[async_trait]
impl GenerativeModel for vedit_genai::GenAiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, GenAiError> {
        vedit_genai::GenAiClient::generate(self, request).await
    }
}

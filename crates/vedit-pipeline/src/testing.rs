//! In-memory collaborator fakes for tests.
//!
//! Shared by the crate's unit tests and the integration tests; not part
//! of the production pipeline.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use vedit_genai::{GenAiError, GenerateRequest, ModelResponse};
use vedit_models::{Frame, VideoId};
use vedit_storage::StorageError;
use vedit_store::StoreError;

use crate::decode::{DecodedFrame, VideoDecoder};
use crate::traits::{FrameRepo, GenerativeModel, ObjectStore};

/// HashMap-backed object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_put_matching: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put_bytes` whose key contains `pattern` fail.
    pub fn with_put_failure(pattern: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_put_matching: Some(pattern.into()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_bytes(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if let Some(pattern) = &self.fail_put_matching {
            if key.contains(pattern.as_str()) {
                return Err(StorageError::upload_failed(format!(
                    "injected failure for {}",
                    key
                )));
            }
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn object_uri(&self, key: &str) -> String {
        format!("mem://{}", key)
    }
}

/// Vec-backed frame repository.
#[derive(Default)]
pub struct MemoryFrameRepo {
    frames: Mutex<Vec<Frame>>,
}

impl MemoryFrameRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_frames(&self) -> Vec<Frame> {
        let mut frames = self.frames.lock().unwrap().clone();
        frames.sort_by_key(|f| f.frame_index);
        frames
    }
}

#[async_trait]
impl FrameRepo for MemoryFrameRepo {
    async fn insert_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        let mut frames = self.frames.lock().unwrap();
        if frames
            .iter()
            .any(|f| f.video_id == frame.video_id && f.frame_index == frame.frame_index)
        {
            return Err(StoreError::Constraint(format!(
                "duplicate frame index {} for video {}",
                frame.frame_index, frame.video_id
            )));
        }
        frames.push(frame.clone());
        Ok(())
    }

    async fn frames_between(
        &self,
        video_id: &VideoId,
        start_millis: u64,
        end_millis: u64,
    ) -> Result<Vec<Frame>, StoreError> {
        let mut frames: Vec<Frame> = self
            .frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| {
                f.video_id == *video_id
                    && f.timestamp_millis >= start_millis
                    && f.timestamp_millis <= end_millis
            })
            .cloned()
            .collect();
        frames.sort_by_key(|f| f.frame_index);
        Ok(frames)
    }
}

/// Model fake that replays a fixed queue of results, in call order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelResponse, GenAiError>>>,
    calls: AtomicU32,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ModelResponse::from_text(text)));
    }

    pub fn push_err(&self, err: GenAiError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, _request: &GenerateRequest) -> Result<ModelResponse, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::invalid_response("scripted replies exhausted")))
    }
}

/// Model fake that routes on the request's shape, so concurrent workers
/// get deterministic replies: an array schema is a plan call, an object
/// schema is a selection call, no schema is an edit call (keyed by the
/// request's first text part, i.e. the edit prompt).
#[derive(Default)]
pub struct RoutedModel {
    plan_reply: Mutex<Option<Result<ModelResponse, GenAiError>>>,
    select_index: AtomicUsize,
    edit_replies: Mutex<HashMap<String, VecDeque<Result<ModelResponse, GenAiError>>>>,
    edit_calls: AtomicU32,
}

impl RoutedModel {
    pub fn new() -> Self {
        let model = Self::default();
        model.select_index.store(4, Ordering::SeqCst);
        model
    }

    pub fn set_plan_text(&self, text: impl Into<String>) {
        *self.plan_reply.lock().unwrap() = Some(Ok(ModelResponse::from_text(text)));
    }

    pub fn set_select_index(&self, index: usize) {
        self.select_index.store(index, Ordering::SeqCst);
    }

    pub fn push_edit_reply(&self, prompt: impl Into<String>, reply: Result<ModelResponse, GenAiError>) {
        self.edit_replies
            .lock()
            .unwrap()
            .entry(prompt.into())
            .or_default()
            .push_back(reply);
    }

    pub fn edit_calls(&self) -> u32 {
        self.edit_calls.load(Ordering::SeqCst)
    }

    fn first_text_part(request: &GenerateRequest) -> Option<String> {
        request.contents.iter().find_map(|content| {
            content.parts.iter().find_map(|part| match part {
                vedit_genai::Part::Text(text) => Some(text.clone()),
                _ => None,
            })
        })
    }
}

#[async_trait]
impl GenerativeModel for RoutedModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse, GenAiError> {
        match &request.response_schema {
            Some(schema) if schema.get("items").is_some() => self
                .plan_reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(ModelResponse::from_text("[]"))),
            Some(_) => {
                let index = self.select_index.load(Ordering::SeqCst);
                Ok(ModelResponse::from_text(format!(
                    "{{\"selectedIndex\": {}}}",
                    index
                )))
            }
            None => {
                self.edit_calls.fetch_add(1, Ordering::SeqCst);
                let prompt = Self::first_text_part(request).unwrap_or_default();
                self.edit_replies
                    .lock()
                    .unwrap()
                    .get_mut(&prompt)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or_else(|| {
                        Err(GenAiError::invalid_response(format!(
                            "unscripted edit call for prompt: {}",
                            prompt
                        )))
                    })
            }
        }
    }
}

/// Decoder fake that yields a fixed frame sequence.
pub struct StaticDecoder {
    frames: VecDeque<DecodedFrame>,
}

impl StaticDecoder {
    pub fn new(frames: Vec<DecodedFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// A decoder yielding `count` JPEG frames spaced `interval_millis` apart.
    pub fn synthetic(count: u32, interval_millis: u64) -> Self {
        let frames = (1..=count)
            .map(|index| DecodedFrame {
                frame_index: index,
                timestamp_millis: (index as u64 - 1) * interval_millis,
                jpeg: tiny_jpeg(30, 30),
            })
            .collect();
        Self::new(frames)
    }
}

#[async_trait]
impl VideoDecoder for StaticDecoder {
    async fn next_frame(&mut self) -> crate::error::PipelineResult<Option<DecodedFrame>> {
        Ok(self.frames.pop_front())
    }
}

/// A small, valid JPEG image.
pub fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([40, 80, 120]),
    ));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Jpeg(90))
        .expect("in-memory jpeg encode");
    bytes
}

//! Frame extraction pipeline.
//!
//! Decodes a video, writes every frame image to object storage, and
//! records one metadata row per frame. Uploads fan out one task per
//! frame; the fan-out is bounded naturally by the frame count, so there
//! is no admission limiter here.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use vedit_models::{frame_object_key, Frame, VideoId};
use vedit_storage::StorageError;

use crate::config::PipelineConfig;
use crate::decode::{DecodedFrame, VideoDecoder};
use crate::error::{PipelineError, PipelineResult};
use crate::traits::{FrameRepo, ObjectStore};

/// Ingest one video: mint a [`VideoId`], upload every decoded frame, and
/// insert its metadata record.
///
/// On success the store holds exactly one record per decoded frame with
/// frame_index 1..N and non-decreasing timestamps. The first error
/// observed wins; when it does, the remaining upload tasks are shut down
/// and drained before the error is returned, so no work outlives the call.
pub async fn ingest_video<D, S, R>(
    decoder: &mut D,
    store: &Arc<S>,
    repo: &Arc<R>,
    config: &PipelineConfig,
) -> PipelineResult<VideoId>
where
    D: VideoDecoder + ?Sized,
    S: ObjectStore + ?Sized + 'static,
    R: FrameRepo + ?Sized + 'static,
{
    let video_id = VideoId::new();
    let mut uploads: JoinSet<PipelineResult<()>> = JoinSet::new();
    let mut decoded = 0u32;

    loop {
        match decoder.next_frame().await {
            Ok(Some(frame)) => {
                decoded += 1;
                let store = Arc::clone(store);
                let repo = Arc::clone(repo);
                let video_id = video_id.clone();
                let deadline = config.frame_upload_timeout;
                uploads.spawn(async move {
                    upload_frame(store, repo, video_id, frame, deadline).await
                });
            }
            Ok(None) => break,
            Err(e) => {
                uploads.shutdown().await;
                return Err(e);
            }
        }
    }

    info!(video_id = %video_id, frames = decoded, "Dispatched frame uploads");

    while let Some(joined) = uploads.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(video_id = %video_id, error = %e, "Frame upload failed, shutting down siblings");
                uploads.shutdown().await;
                return Err(e);
            }
            Err(join_err) if join_err.is_panic() => {
                uploads.shutdown().await;
                return Err(PipelineError::validation(format!(
                    "frame upload task panicked: {}",
                    join_err
                )));
            }
            Err(_) => {}
        }
    }

    info!(video_id = %video_id, frames = decoded, "Video ingested");
    Ok(video_id)
}

async fn upload_frame<S, R>(
    store: Arc<S>,
    repo: Arc<R>,
    video_id: VideoId,
    frame: DecodedFrame,
    deadline: std::time::Duration,
) -> PipelineResult<()>
where
    S: ObjectStore + ?Sized,
    R: FrameRepo + ?Sized,
{
    let key = frame_object_key(&video_id, frame.frame_index);

    tokio::time::timeout(deadline, store.put_bytes(&key, frame.jpeg, "image/jpeg"))
        .await
        .map_err(|_| {
            StorageError::upload_failed(format!(
                "frame {} write exceeded {:?}",
                frame.frame_index, deadline
            ))
        })??;

    repo.insert_frame(&Frame {
        video_id,
        frame_index: frame.frame_index,
        timestamp_millis: frame.timestamp_millis,
        object_path: key,
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFrameRepo, MemoryObjectStore, StaticDecoder};

    #[tokio::test]
    async fn test_ingest_records_every_frame_in_order() {
        let store = Arc::new(MemoryObjectStore::new());
        let repo = Arc::new(MemoryFrameRepo::new());
        let mut decoder = StaticDecoder::synthetic(3, 1000);

        let video_id = ingest_video(&mut decoder, &store, &repo, &PipelineConfig::default())
            .await
            .unwrap();

        let frames = repo.all_frames();
        assert_eq!(frames.len(), 3);
        let indices: Vec<u32> = frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        let timestamps: Vec<u64> = frames.iter().map(|f| f.timestamp_millis).collect();
        assert_eq!(timestamps, vec![0, 1000, 2000]);

        assert_eq!(store.len(), 3);
        assert!(store.contains(&frame_object_key(&video_id, 1)));
        assert!(store.contains(&frame_object_key(&video_id, 3)));
    }

    #[tokio::test]
    async fn test_ingest_surfaces_upload_failure() {
        let store = Arc::new(MemoryObjectStore::with_put_failure("frame_0002"));
        let repo = Arc::new(MemoryFrameRepo::new());
        let mut decoder = StaticDecoder::synthetic(3, 40);

        let err = ingest_video(&mut decoder, &store, &repo, &PipelineConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Storage(_)));
        // No metadata row for the failed frame; siblings may or may not
        // have completed before the shutdown.
        assert!(repo.all_frames().iter().all(|f| f.frame_index != 2));
    }

    #[tokio::test]
    async fn test_ingest_of_empty_decoder_yields_no_frames() {
        let store = Arc::new(MemoryObjectStore::new());
        let repo = Arc::new(MemoryFrameRepo::new());
        let mut decoder = StaticDecoder::new(Vec::new());

        ingest_video(&mut decoder, &store, &repo, &PipelineConfig::default())
            .await
            .unwrap();

        assert!(repo.all_frames().is_empty());
        assert!(store.is_empty());
    }
}

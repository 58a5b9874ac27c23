//! Frame edit orchestration.
//!
//! Two entry points:
//!
//! - [`ingest_video`]: decode a source video, upload every frame to
//!   object storage, and record per-frame metadata.
//! - [`edit_video`]: retrieve the frames of a time window, plan edits
//!   with a generative model, localize each edit to one tile of a 3x3
//!   partition, and apply the edits concurrently, writing the results
//!   to a local output directory.
//!
//! All external collaborators (object store, metadata store, model
//! service, decoder) are passed in as explicit handles behind the traits
//! in [`traits`].

pub mod config;
pub mod decode;
pub mod error;
pub mod executor;
pub mod extract;
pub mod plan;
pub mod retry;
pub mod select;
pub mod testing;
pub mod traits;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use vedit_models::VideoId;

pub use config::PipelineConfig;
pub use decode::{DecodedFrame, FfmpegDecoder, VideoDecoder};
pub use error::{PipelineError, PipelineResult};
pub use extract::ingest_video;
pub use plan::PlanReply;
pub use traits::{FrameRepo, GenerativeModel, ObjectStore};

/// Edit the frames of `video_id` that fall inside `[start_millis,
/// end_millis]` according to `prompt`.
///
/// Returns the directory the edited frames were written to. An empty
/// window is a success with no output; a plan reply that cannot be
/// parsed degrades to an empty plan. Any failure after planning aborts
/// the whole run with the first error observed, leaving already-written
/// frames in place.
pub async fn edit_video<S, R, M>(
    store: &Arc<S>,
    repo: &Arc<R>,
    model: &Arc<M>,
    config: &PipelineConfig,
    video_id: &VideoId,
    prompt: &str,
    start_millis: u64,
    end_millis: u64,
) -> PipelineResult<PathBuf>
where
    S: ObjectStore + ?Sized + 'static,
    R: FrameRepo + ?Sized,
    M: GenerativeModel + ?Sized + 'static,
{
    let frames = repo.frames_between(video_id, start_millis, end_millis).await?;
    if frames.is_empty() {
        info!(
            video_id = %video_id,
            start_millis,
            end_millis,
            "No frames in window, nothing to edit"
        );
        return Ok(config.output_dir.clone());
    }
    info!(video_id = %video_id, frames = frames.len(), "Retrieved window");

    let reply = plan::plan_edits(store.as_ref(), model.as_ref(), config, &frames, prompt).await?;
    let directives = reply.directives_or_default();
    info!(directives = directives.len(), "Plan resolved");

    let resolved = plan::resolve_directives(directives, &frames)?;

    let invocation_id = Uuid::new_v4().to_string();
    executor::execute_edits(store, model, config, video_id, &invocation_id, resolved).await?;

    Ok(config.output_dir.clone())
}

//! Edit execution stage.
//!
//! Runs one worker per directive under a fixed-capacity admission
//! semaphore. The semaphore models the model service's rate-limit budget,
//! which is the bottleneck here, not local CPU.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use vedit_genai::{Content, GenerateRequest, Part};
use vedit_models::{Frame, VideoId};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::generate_with_backoff;
use crate::select::select_region;
use crate::traits::{GenerativeModel, ObjectStore};

const EDITOR_INSTRUCTIONS: &str = include_str!("../prompts/editor.md");

/// Apply every directive, writing one `frame_<index>.jpg` per directive
/// into the output directory.
///
/// Returns Ok only if every dispatched directive produced exactly one
/// output artifact; otherwise returns the first error observed after
/// shutting down and draining the remaining workers. Artifacts written by
/// workers that already succeeded stay on disk.
pub async fn execute_edits<S, M>(
    store: &Arc<S>,
    model: &Arc<M>,
    config: &PipelineConfig,
    video_id: &VideoId,
    invocation_id: &str,
    directives: Vec<(Frame, String)>,
) -> PipelineResult<()>
where
    S: ObjectStore + ?Sized + 'static,
    M: GenerativeModel + ?Sized + 'static,
{
    if directives.is_empty() {
        info!("No directives to execute");
        return Ok(());
    }

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let dispatched = directives.len();
    let semaphore = Arc::new(Semaphore::new(config.edit_concurrency));
    let mut workers: JoinSet<PipelineResult<()>> = JoinSet::new();

    for (frame, prompt) in directives {
        let store = Arc::clone(store);
        let model = Arc::clone(model);
        let semaphore = Arc::clone(&semaphore);
        let config = config.clone();
        let tile_prefix = format!(
            "{}/tiles/{}/frame_{:04}",
            video_id, invocation_id, frame.frame_index
        );
        workers.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::validation("admission semaphore closed"))?;
            edit_frame(&store, &model, &config, &frame, &prompt, &tile_prefix).await
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Edit worker failed, shutting down siblings");
                workers.shutdown().await;
                return Err(e);
            }
            Err(join_err) if join_err.is_panic() => {
                workers.shutdown().await;
                return Err(PipelineError::validation(format!(
                    "edit worker panicked: {}",
                    join_err
                )));
            }
            Err(_) => {}
        }
    }

    info!(directives = dispatched, "All edits completed");
    Ok(())
}

async fn edit_frame<S, M>(
    store: &Arc<S>,
    model: &Arc<M>,
    config: &PipelineConfig,
    frame: &Frame,
    prompt: &str,
    tile_prefix: &str,
) -> PipelineResult<()>
where
    S: ObjectStore + ?Sized + 'static,
    M: GenerativeModel + ?Sized,
{
    let target_uri = select_region(
        store,
        model.as_ref(),
        config,
        &frame.object_path,
        prompt,
        tile_prefix,
    )
    .await?;

    let request = GenerateRequest::new(&config.edit_model)
        .with_system_instruction(EDITOR_INSTRUCTIONS)
        .with_content(Content::user(vec![
            Part::text(prompt),
            Part::file_ref(target_uri, "image/jpeg"),
        ]));

    let response = generate_with_backoff(
        model.as_ref(),
        &request,
        config.max_edit_attempts,
        config.retry_base_delay,
    )
    .await?;

    let image = response.first_inline_image().ok_or_else(|| {
        PipelineError::validation(format!(
            "edit response for frame {} carried no inline image",
            frame.frame_index
        ))
    })?;

    let output_path = config
        .output_dir
        .join(format!("frame_{:04}.jpg", frame.frame_index));
    tokio::fs::write(&output_path, image).await?;

    info!(
        frame_index = frame.frame_index,
        path = %output_path.display(),
        "Edited frame written"
    );
    Ok(())
}

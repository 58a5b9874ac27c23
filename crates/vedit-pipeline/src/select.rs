//! Region selection stage.
//!
//! Localizes an edit to one cell of a 3x3 partition of the target frame:
//! download the frame, crop and upload all 9 tiles, then ask the model
//! which tile the edit prompt refers to.

use std::io::Cursor;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use vedit_genai::{Content, GenerateRequest, Part};
use vedit_models::{tile_grid, TILE_COUNT};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::traits::{GenerativeModel, ObjectStore};

const SELECTOR_INSTRUCTIONS: &str = include_str!("../prompts/selector.md");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionReply {
    selected_index: usize,
}

/// Pick the tile of `object_path` most relevant to `edit_prompt` and
/// return its stored reference.
///
/// All 9 tiles are cropped and uploaded concurrently under `tile_prefix`
/// (a per-invocation namespace, so repeated or concurrent runs cannot
/// collide). A tile whose crop or upload fails is recorded as missing,
/// and any missing tile fails the stage; no placeholder is substituted.
pub async fn select_region<S, M>(
    store: &Arc<S>,
    model: &M,
    config: &PipelineConfig,
    object_path: &str,
    edit_prompt: &str,
    tile_prefix: &str,
) -> PipelineResult<String>
where
    S: ObjectStore + ?Sized + 'static,
    M: GenerativeModel + ?Sized,
{
    let bytes = store.get_bytes(object_path).await?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| PipelineError::decode(format!("frame image undecodable: {}", e)))?;
    let (width, height) = (image.width(), image.height());
    debug!(object_path, width, height, "Partitioning frame for region selection");

    let image = Arc::new(image);
    let mut crops: JoinSet<(usize, Option<String>)> = JoinSet::new();

    for (index, rect) in tile_grid(width, height).into_iter().enumerate() {
        let image = Arc::clone(&image);
        let store = Arc::clone(store);
        let key = format!("{}/tile_{}.jpg", tile_prefix, index);
        crops.spawn(async move {
            if rect.is_empty() {
                warn!(tile = index, "Tile crop yielded an empty region");
                return (index, None);
            }
            let cropped = image.crop_imm(rect.min_x, rect.min_y, rect.width, rect.height);
            let mut buffer = Vec::new();
            if let Err(e) = cropped.write_to(
                &mut Cursor::new(&mut buffer),
                image::ImageOutputFormat::Jpeg(90),
            ) {
                warn!(tile = index, error = %e, "Tile encode failed");
                return (index, None);
            }
            match store.put_bytes(&key, buffer, "image/jpeg").await {
                Ok(()) => (index, Some(key)),
                Err(e) => {
                    warn!(tile = index, error = %e, "Tile upload failed");
                    (index, None)
                }
            }
        });
    }

    let mut tile_keys: [Option<String>; TILE_COUNT] = Default::default();
    while let Some(joined) = crops.join_next().await {
        let (index, key) = joined
            .map_err(|e| PipelineError::validation(format!("tile task panicked: {}", e)))?;
        tile_keys[index] = key;
    }

    let mut keys = Vec::with_capacity(TILE_COUNT);
    for (index, key) in tile_keys.into_iter().enumerate() {
        keys.push(key.ok_or_else(|| {
            PipelineError::validation(format!("no stored tile for index {}", index))
        })?);
    }

    let tile_parts = keys
        .iter()
        .map(|key| Part::file_ref(store.object_uri(key), "image/jpeg"))
        .collect();

    let request = GenerateRequest::new(&config.select_model)
        .with_system_instruction(SELECTOR_INSTRUCTIONS)
        .with_response_schema(selection_schema())
        .with_content(Content::user(vec![Part::text(edit_prompt)]))
        .with_content(Content::user(tile_parts));

    let response = model.generate(&request).await?;
    let selected = parse_selection(&response.text())?;

    Ok(store.object_uri(&keys[selected]))
}

/// Strict parse of the selection reply: the index must be present and in
/// [0, 8].
fn parse_selection(text: &str) -> PipelineResult<usize> {
    let reply: SelectionReply = serde_json::from_str(text).map_err(|e| {
        PipelineError::validation(format!("selection reply missing selectedIndex: {}", e))
    })?;
    if reply.selected_index >= TILE_COUNT {
        return Err(PipelineError::validation(format!(
            "selectedIndex {} outside tile grid",
            reply.selected_index
        )));
    }
    Ok(reply.selected_index)
}

fn selection_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "selectedIndex": {"type": "integer"}
        },
        "required": ["selectedIndex"]
    })
}

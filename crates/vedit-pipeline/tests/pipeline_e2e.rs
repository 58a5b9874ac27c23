//! End-to-end pipeline test against in-memory collaborators: ingest a
//! synthetic video, then edit a one-frame window.

use std::sync::Arc;

use vedit_models::frame_object_key;
use vedit_pipeline::testing::{MemoryFrameRepo, MemoryObjectStore, RoutedModel, StaticDecoder};
use vedit_pipeline::{edit_video, ingest_video, PipelineConfig};

#[tokio::test]
async fn test_ingest_then_edit_single_frame_window() {
    let store = Arc::new(MemoryObjectStore::new());
    let repo = Arc::new(MemoryFrameRepo::new());

    // Three frames, one second apart.
    let mut decoder = StaticDecoder::synthetic(3, 1000);
    let config = PipelineConfig::default();

    let video_id = ingest_video(&mut decoder, &store, &repo, &config)
        .await
        .unwrap();

    let frames = repo.all_frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames.iter().map(|f| f.frame_index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(store.contains(&frame_object_key(&video_id, 2)));

    // The [1s, 1s] window holds exactly the second frame; the plan asks
    // to edit it, selection picks the center tile, and the edit call
    // returns a replacement image.
    let edited_bytes = vec![9u8, 9, 9, 9];
    let model = Arc::new(RoutedModel::new());
    model.set_plan_text(r#"[{"imageIndex": 0, "imagePrompt": "remove background"}]"#);
    model.set_select_index(4);
    model.push_edit_reply(
        "remove background",
        Ok(vedit_genai::ModelResponse::from_inline_image(
            "image/jpeg",
            edited_bytes.clone(),
        )),
    );

    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        output_dir: out.path().to_path_buf(),
        ..PipelineConfig::default()
    };

    let output_dir = edit_video(
        &store,
        &repo,
        &model,
        &config,
        &video_id,
        "remove background",
        1000,
        1000,
    )
    .await
    .unwrap();

    assert_eq!(output_dir, out.path());

    // Exactly one edited frame, named by its video frame index.
    let written: Vec<String> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(written, vec!["frame_0002.jpg".to_string()]);
    assert_eq!(
        std::fs::read(out.path().join("frame_0002.jpg")).unwrap(),
        edited_bytes
    );

    // The 9 tiles landed under the frame's invocation namespace.
    let tile_keys: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|k| k.contains("/tiles/") && k.contains("frame_0002"))
        .collect();
    assert_eq!(tile_keys.len(), 9);
}

#[tokio::test]
async fn test_empty_window_is_a_no_op() {
    let store = Arc::new(MemoryObjectStore::new());
    let repo = Arc::new(MemoryFrameRepo::new());

    let mut decoder = StaticDecoder::synthetic(2, 1000);
    let config = PipelineConfig::default();
    let video_id = ingest_video(&mut decoder, &store, &repo, &config)
        .await
        .unwrap();

    let model = Arc::new(RoutedModel::new());
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        output_dir: out.path().to_path_buf(),
        ..PipelineConfig::default()
    };

    // Window past the end of the video.
    edit_video(
        &store, &repo, &model, &config, &video_id, "p", 10_000, 20_000,
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    assert_eq!(model.edit_calls(), 0);
}

#[tokio::test]
async fn test_unparseable_plan_degrades_to_no_edits() {
    let store = Arc::new(MemoryObjectStore::new());
    let repo = Arc::new(MemoryFrameRepo::new());

    let mut decoder = StaticDecoder::synthetic(1, 1000);
    let config = PipelineConfig::default();
    let video_id = ingest_video(&mut decoder, &store, &repo, &config)
        .await
        .unwrap();

    let model = Arc::new(RoutedModel::new());
    model.set_plan_text("Sorry, I cannot help with that.");

    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        output_dir: out.path().to_path_buf(),
        ..PipelineConfig::default()
    };

    edit_video(&store, &repo, &model, &config, &video_id, "p", 0, 5000)
        .await
        .unwrap();

    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    assert_eq!(model.edit_calls(), 0);
}

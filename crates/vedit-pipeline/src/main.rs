//! Frame edit pipeline binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vedit_genai::GenAiClient;
use vedit_models::VideoId;
use vedit_pipeline::{edit_video, ingest_video, FfmpegDecoder, PipelineConfig};
use vedit_storage::StorageClient;
use vedit_store::FrameStore;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vedit=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("upload") if args.len() == 3 => run_upload(&args[2]).await,
        Some("edit") if args.len() == 6 => {
            run_edit(&args[2], &args[3], &args[4], &args[5]).await
        }
        _ => {
            eprintln!("Usage:");
            eprintln!("  vedit upload <videoPath>");
            eprintln!("  vedit edit <videoID> <prompt> <startSeconds> <endSeconds>");
            std::process::exit(2);
        }
    }
}

async fn run_upload(video_path: &str) {
    let (store, repo, config) = build_data_handles().await;

    let mut decoder = match FfmpegDecoder::open(video_path).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to open video: {}", e);
            std::process::exit(1);
        }
    };

    match ingest_video(&mut decoder, &store, &repo, &config).await {
        Ok(video_id) => {
            let frames = repo.frame_count(&video_id).await.unwrap_or(0);
            info!(video_id = %video_id, frames, "Upload complete");
            println!("{}", video_id);
        }
        Err(e) => {
            error!("Upload failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_edit(video_id: &str, prompt: &str, start_seconds: &str, end_seconds: &str) {
    let (store, repo, config) = build_data_handles().await;

    // Only the edit command talks to the model service; upload must not
    // require model credentials.
    let model = match GenAiClient::from_env() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!("Failed to create model client: {}", e);
            std::process::exit(1);
        }
    };

    let video_id = VideoId::from_string(video_id.to_string());
    let (start, end) = match (start_seconds.parse::<u64>(), end_seconds.parse::<u64>()) {
        (Ok(start), Ok(end)) if start <= end => (start * 1000, end * 1000),
        _ => {
            eprintln!("startSeconds and endSeconds must be integers with start <= end");
            std::process::exit(2);
        }
    };

    match edit_video(&store, &repo, &model, &config, &video_id, prompt, start, end).await {
        Ok(output_dir) => {
            info!(output_dir = %output_dir.display(), "Edit complete");
            println!("Edited frames written to {}", output_dir.display());
        }
        Err(e) => {
            error!("Edit failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn build_data_handles() -> (Arc<StorageClient>, Arc<FrameStore>, PipelineConfig) {
    let config = PipelineConfig::from_env();

    let store = match StorageClient::from_env().await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let repo = match FrameStore::from_env().await {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to open frame store: {}", e);
            std::process::exit(1);
        }
    };

    (store, repo, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The upload command's collaborators must construct without model
    // credentials; only the edit command builds the model client.
    #[tokio::test]
    async fn test_upload_handles_need_no_model_credentials() {
        std::env::remove_var("GEMINI_API_KEY");
        std::env::set_var("STORAGE_ENDPOINT_URL", "http://localhost:9000");
        std::env::set_var("STORAGE_ACCESS_KEY_ID", "test-access-key");
        std::env::set_var("STORAGE_SECRET_ACCESS_KEY", "test-secret-key");
        std::env::set_var("STORAGE_BUCKET_NAME", "test-bucket");
        std::env::set_var("DATABASE_URL", "sqlite::memory:");

        assert!(StorageClient::from_env().await.is_ok());
        assert!(FrameStore::from_env().await.is_ok());

        // The model client does require credentials, which is why it is
        // built only at the edit boundary.
        assert!(GenAiClient::from_env().is_err());
    }
}

//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum concurrent in-flight edit workers. Models the external
    /// service's rate-limit budget, which is the true bottleneck, not
    /// local CPU.
    pub edit_concurrency: usize,
    /// Maximum edit-call attempts per directive (initial call included)
    pub max_edit_attempts: u32,
    /// Base delay for exponential backoff on rate-limited edit calls
    pub retry_base_delay: Duration,
    /// Deadline for each per-frame object-storage write during ingest
    pub frame_upload_timeout: Duration,
    /// Directory edited frames are written to
    pub output_dir: PathBuf,
    /// Model used by the plan stage
    pub plan_model: String,
    /// Model used by region selection
    pub select_model: String,
    /// Model used for the edit call itself
    pub edit_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edit_concurrency: 10,
            max_edit_attempts: 5,
            retry_base_delay: Duration::from_secs(2),
            frame_upload_timeout: Duration::from_secs(50),
            output_dir: PathBuf::from("edited"),
            plan_model: "gemini-3-pro-preview".to_string(),
            select_model: "gemini-2.5-flash".to_string(),
            edit_model: "gemini-3-pro-image-preview".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            edit_concurrency: std::env::var("VEDIT_EDIT_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.edit_concurrency),
            max_edit_attempts: std::env::var("VEDIT_MAX_EDIT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_edit_attempts),
            retry_base_delay: Duration::from_secs(
                std::env::var("VEDIT_RETRY_BASE_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            frame_upload_timeout: Duration::from_secs(
                std::env::var("VEDIT_FRAME_UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(50),
            ),
            output_dir: std::env::var("VEDIT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            plan_model: std::env::var("VEDIT_PLAN_MODEL").unwrap_or(defaults.plan_model),
            select_model: std::env::var("VEDIT_SELECT_MODEL").unwrap_or(defaults.select_model),
            edit_model: std::env::var("VEDIT_EDIT_MODEL").unwrap_or(defaults.edit_model),
        }
    }
}

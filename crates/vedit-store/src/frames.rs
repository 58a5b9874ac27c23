//! Frame metadata persistence and time-window retrieval.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use vedit_models::{Frame, VideoId};

use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS frames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT NOT NULL,
    frame_index INTEGER NOT NULL,
    timestamp_millis INTEGER NOT NULL,
    object_path TEXT NOT NULL,
    UNIQUE (video_id, frame_index)
);
CREATE INDEX IF NOT EXISTS idx_frames_video_ts ON frames (video_id, timestamp_millis);
"#;

/// SQLite-backed store of frame metadata records.
#[derive(Clone)]
pub struct FrameStore {
    pool: SqlitePool,
}

impl FrameStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// SQLite serializes writers anyway; a single pooled connection also
    /// keeps in-memory databases coherent across calls.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::config_error(format!("invalid database url: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        debug!("Frame store ready at {}", url);
        Ok(Self { pool })
    }

    /// Create from the `DATABASE_URL` environment variable, defaulting to
    /// a local `frames.db` file.
    pub async fn from_env() -> StoreResult<Self> {
        let url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:frames.db".to_string());
        Self::connect(&url).await
    }

    /// Insert one frame metadata record.
    ///
    /// Rejects duplicate `(video_id, frame_index)` pairs.
    pub async fn insert_frame(&self, frame: &Frame) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO frames (video_id, frame_index, timestamp_millis, object_path) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(frame.video_id.as_str())
        .bind(frame.frame_index as i64)
        .bind(frame.timestamp_millis as i64)
        .bind(&frame.object_path)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All frames of `video_id` with `start_millis <= ts <= end_millis`
    /// (both inclusive), ordered by ascending frame index.
    ///
    /// The ordering matters: plan-stage directives address positions in
    /// this list, so it must be stable within one invocation.
    pub async fn frames_between(
        &self,
        video_id: &VideoId,
        start_millis: u64,
        end_millis: u64,
    ) -> StoreResult<Vec<Frame>> {
        let rows = sqlx::query(
            "SELECT video_id, frame_index, timestamp_millis, object_path FROM frames \
             WHERE video_id = ?1 AND timestamp_millis BETWEEN ?2 AND ?3 \
             ORDER BY frame_index ASC",
        )
        .bind(video_id.as_str())
        .bind(start_millis as i64)
        .bind(end_millis as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut frames = Vec::with_capacity(rows.len());
        for row in rows {
            frames.push(Frame {
                video_id: VideoId::from_string(row.try_get::<String, _>("video_id")?),
                frame_index: row.try_get::<i64, _>("frame_index")? as u32,
                timestamp_millis: row.try_get::<i64, _>("timestamp_millis")? as u64,
                object_path: row.try_get::<String, _>("object_path")?,
            });
        }

        Ok(frames)
    }

    /// Number of frame records stored for `video_id`.
    pub async fn frame_count(&self, video_id: &VideoId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM frames WHERE video_id = ?1")
            .bind(video_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vedit_models::frame_object_key;

    async fn store_with_frames(video_id: &VideoId, timestamps: &[u64]) -> FrameStore {
        let store = FrameStore::connect("sqlite::memory:").await.unwrap();
        for (i, ts) in timestamps.iter().enumerate() {
            let index = (i + 1) as u32;
            store
                .insert_frame(&Frame {
                    video_id: video_id.clone(),
                    frame_index: index,
                    timestamp_millis: *ts,
                    object_path: frame_object_key(video_id, index),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let id = VideoId::new();
        let store = store_with_frames(&id, &[0, 1000, 2000, 3000]).await;

        let frames = store.frames_between(&id, 1000, 2000).await.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp_millis, 1000);
        assert_eq!(frames[1].timestamp_millis, 2000);
    }

    #[tokio::test]
    async fn test_empty_window_is_not_an_error() {
        let id = VideoId::new();
        let store = store_with_frames(&id, &[0, 1000]).await;

        let frames = store.frames_between(&id, 400, 600).await.unwrap();
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_results_ordered_by_frame_index() {
        let id = VideoId::new();
        let store = FrameStore::connect("sqlite::memory:").await.unwrap();

        // Insert out of order; retrieval must still come back ascending.
        for index in [3u32, 1, 2] {
            store
                .insert_frame(&Frame {
                    video_id: id.clone(),
                    frame_index: index,
                    timestamp_millis: (index as u64 - 1) * 500,
                    object_path: frame_object_key(&id, index),
                })
                .await
                .unwrap();
        }

        let frames = store.frames_between(&id, 0, 10_000).await.unwrap();
        let indices: Vec<u32> = frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_frame_index_is_rejected() {
        let id = VideoId::new();
        let store = store_with_frames(&id, &[0]).await;

        let duplicate = Frame {
            video_id: id.clone(),
            frame_index: 1,
            timestamp_millis: 42,
            object_path: frame_object_key(&id, 1),
        };
        assert!(store.insert_frame(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_other_videos_are_not_returned() {
        let a = VideoId::new();
        let b = VideoId::new();
        let store = store_with_frames(&a, &[0, 1000]).await;
        store
            .insert_frame(&Frame {
                video_id: b.clone(),
                frame_index: 1,
                timestamp_millis: 500,
                object_path: frame_object_key(&b, 1),
            })
            .await
            .unwrap();

        let frames = store.frames_between(&a, 0, 2000).await.unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.video_id == a));
    }
}

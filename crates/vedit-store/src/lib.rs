//! SQLite-backed frame metadata store.
//!
//! One table, `frames`, uniquely keyed by `(video_id, frame_index)` and
//! queryable by video plus an inclusive timestamp range.

pub mod error;
pub mod frames;

pub use error::{StoreError, StoreResult};
pub use frames::FrameStore;

//! Shared data models for the vedit pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video identity and frame metadata records
//! - Edit directives produced by the plan stage
//! - 3x3 tile geometry used by region selection

pub mod directive;
pub mod frame;
pub mod tile;

// Re-export common types
pub use directive::EditDirective;
pub use frame::{frame_object_key, Frame, VideoId};
pub use tile::{tile_grid, TileRect, TILE_COUNT, TILE_GRID_DIM};

//! 3x3 tile geometry for region selection.

use serde::{Deserialize, Serialize};

/// Grid dimension: frames are partitioned into `TILE_GRID_DIM` columns and rows.
pub const TILE_GRID_DIM: u32 = 3;

/// Total tiles per frame.
pub const TILE_COUNT: usize = (TILE_GRID_DIM * TILE_GRID_DIM) as usize;

/// One rectangular cell of a frame partition, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    /// X coordinate of the top-left corner
    pub min_x: u32,
    /// Y coordinate of the top-left corner
    pub min_y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TileRect {
    /// True if the rect covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Partition an image into 9 tiles, row-major (index 0 is top-left,
/// index 8 is bottom-right).
///
/// Tile size is `width / 3` by `height / 3` using integer division, so for
/// dimensions that are not multiples of 3 the remainder pixels along the
/// bottom and right edges fall outside every tile. That gap is documented
/// behavior and is not corrected here.
pub fn tile_grid(width: u32, height: u32) -> [TileRect; TILE_COUNT] {
    let tile_w = width / TILE_GRID_DIM;
    let tile_h = height / TILE_GRID_DIM;

    std::array::from_fn(|i| {
        let i = i as u32;
        TileRect {
            min_x: (i % TILE_GRID_DIM) * tile_w,
            min_y: (i / TILE_GRID_DIM) * tile_h,
            width: tile_w,
            height: tile_h,
        }
    })
}

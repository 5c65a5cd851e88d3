//! Error types for sprite sheet loading, decoding and persistence.
//!
//! None of these escape `get` or the constructors: they are logged and turned
//! into an absent result at that boundary.

use crate::decoder::Rect;

#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// The index document is not UTF-8 JSON, or its root is not an object.
    #[error("sprite index parse error: {0}")]
    IndexParse(String),

    /// A required numeric field is missing or is not a number.
    #[error("no int for {field} found")]
    Field { field: &'static str },

    /// The rectangle does not fit inside the source image.
    #[error("region {rect:?} outside of {width}x{height} image")]
    RegionOutOfBounds { rect: Rect, width: u32, height: u32 },

    /// Coordinates that cannot describe a pixel rectangle (negative or empty).
    #[error("invalid region {0}")]
    InvalidRegion(String),

    /// The sprite image could not be decoded at all.
    #[error("image open error: {0}")]
    ImageOpen(#[from] image::ImageError),

    /// Spilling to or reading from the cache store failed.
    #[error("cache store error: {0}")]
    Store(#[from] std::io::Error),

    /// A persisted atlas record could not be encoded or decoded.
    #[error("persisted state error: {0}")]
    State(#[from] serde_json::Error),
}

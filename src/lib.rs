//! Named icon lookup over sprite sheets.
//!
//! A sprite sheet is one image with many packed icons plus a JSON index
//! mapping icon names to pixel rectangles:
//!
//! ```text
//! index JSON + image bytes
//!     │
//!     ▼
//! SpriteAtlas::new()            ← parse index, open image
//!     │
//!     ▼
//! SpriteAtlas::get("bank_11")   ← look up rect, decode region, memoize
//! ```
//!
//! [`PersistentSpriteAtlas`] additionally spills the image into a
//! [`CacheStore`] so the atlas can be serialized and restored later without
//! the original stream.
//!
//! Failures never propagate out of `get` or the constructors. They are logged
//! and the lookup returns `None`; see [`AtlasStatus`] for the degraded states.

pub mod atlas;
pub mod config;
pub mod decoder;
pub mod error;
pub mod index;
pub mod logging;
pub mod persistent;
pub mod settings;
pub mod store;

#[cfg(test)]
mod test_support;

pub use atlas::{AtlasStatus, Bitmap, SpriteAtlas};
pub use decoder::{Rect, RegionDecoder, SheetDecoder};
pub use error::AtlasError;
pub use index::{AtlasIndex, Metadata, ICON_HEIGHT, ICON_WIDTH, ICON_X, ICON_Y};
pub use persistent::{AtlasState, PersistentSpriteAtlas};
pub use settings::AtlasSettings;
pub use store::CacheStore;

use std::fs;
use std::path::Path;

use image::RgbaImage;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::error::AtlasError;

/// Pixel rectangle inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from the integer fields of an index entry.
    pub fn from_fields(x: i64, y: i64, width: i64, height: i64) -> Result<Self, AtlasError> {
        let convert = |value: i64, what: &str| {
            u32::try_from(value)
                .map_err(|_| AtlasError::InvalidRegion(format!("{} = {}", what, value)))
        };
        let rect = Self::new(
            convert(x, "x")?,
            convert(y, "y")?,
            convert(width, "width")?,
            convert(height, "height")?,
        );
        if rect.width == 0 || rect.height == 0 {
            return Err(AtlasError::InvalidRegion(format!("empty rectangle {:?}", rect)));
        }
        Ok(rect)
    }

    /// Exclusive right edge, `None` on overflow
    pub fn right(&self) -> Option<u32> {
        self.x.checked_add(self.width)
    }

    /// Exclusive bottom edge, `None` on overflow
    pub fn bottom(&self) -> Option<u32> {
        self.y.checked_add(self.height)
    }

    /// True if the rectangle lies entirely within a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        matches!((self.right(), self.bottom()), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

/// Decodes rectangular regions of one opened image into RGBA8 bitmaps (straight alpha).
pub trait RegionDecoder: Send {
    /// Full image dimensions as (width, height).
    fn dimensions(&self) -> (u32, u32);

    fn decode_region(&self, rect: Rect) -> Result<RgbaImage, AtlasError>;
}

/// Region decoder over a sprite sheet decoded with the `image` crate.
pub struct SheetDecoder {
    sheet: RgbaImage,
}

impl SheetDecoder {
    /// Open encoded image bytes. The format is guessed from the content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AtlasError> {
        let sheet = image::load_from_memory(bytes)?.to_rgba8();
        debug!("Opened sprite sheet {}x{}", sheet.width(), sheet.height());
        Ok(Self { sheet })
    }

    /// Open an image file. Cache files carry no extension, so the content decides the format.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AtlasError> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

impl RegionDecoder for SheetDecoder {
    fn dimensions(&self) -> (u32, u32) {
        self.sheet.dimensions()
    }

    fn decode_region(&self, rect: Rect) -> Result<RgbaImage, AtlasError> {
        let (width, height) = self.dimensions();
        if !rect.fits_within(width, height) {
            return Err(AtlasError::RegionOutOfBounds { rect, width, height });
        }
        Ok(image::imageops::crop_imm(&self.sheet, rect.x, rect.y, rect.width, rect.height).to_image())
    }
}

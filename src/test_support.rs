//! Fixtures shared by the unit tests.
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::json;

use crate::decoder::{Rect, RegionDecoder, SheetDecoder};
use crate::error::AtlasError;

/// Color of sheet pixel (x, y); every coordinate pair in a small sheet is distinct.
pub fn sheet_pixel(x: u32, y: u32) -> Rgba<u8> {
    Rgba([x as u8, y as u8, (x ^ y) as u8, 255 - (x % 7) as u8])
}

/// PNG-encoded sprite sheet of the given size
pub fn sheet_png(width: u32, height: u32) -> Vec<u8> {
    let sheet = RgbaImage::from_fn(width, height, sheet_pixel);
    let mut bytes = Cursor::new(Vec::new());
    sheet.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Index for a 64x32 sheet with valid, malformed and out-of-range entries
pub fn index_json() -> String {
    json!({
        "aerialway_11": { "height": 15, "pixelRatio": 1, "width": 15, "x": 40, "y": 2 },
        "bank_11": { "height": 13, "pixelRatio": 1, "width": 11, "x": 0, "y": 0 },
        "fractional": { "height": 2.5, "width": 3.9, "x": 1.7, "y": 1.2 },
        "no_height": { "width": 4, "x": 0, "y": 0 },
        "string_width": { "height": 4, "width": "15", "x": 0, "y": 0 },
        "negative_x": { "height": 4, "width": 4, "x": -1, "y": 0 },
        "out_of_bounds": { "height": 10, "width": 10, "x": 60, "y": 0 },
        "scalar_entry": 5,
    })
    .to_string()
}

/// Sheet decoder that counts `decode_region` calls
pub struct CountingDecoder {
    inner: SheetDecoder,
    calls: Arc<AtomicUsize>,
}

impl CountingDecoder {
    pub fn new(png: &[u8]) -> Self {
        Self {
            inner: SheetDecoder::from_bytes(png).unwrap(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl RegionDecoder for CountingDecoder {
    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn decode_region(&self, rect: Rect) -> Result<RgbaImage, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode_region(rect)
    }
}

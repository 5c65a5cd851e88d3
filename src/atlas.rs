use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::decoder::{Rect, RegionDecoder, SheetDecoder};
use crate::error::AtlasError;
use crate::index::{require_int, AtlasIndex, Metadata, ICON_HEIGHT, ICON_WIDTH, ICON_X, ICON_Y};

/// Decoded icon. Shared so repeated lookups hand out the same bitmap.
pub type Bitmap = Arc<RgbaImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlasStatus {
    /// Index parsed and image opened.
    Ready,
    /// Index available, but the image could not be opened; every new lookup is absent.
    DegradedNoImage,
    /// The index document did not parse; every new lookup is absent.
    DegradedNoIndex,
    /// The backing image was released; decoding is permanently disabled.
    Evicted,
}

/// Looks up icons by name in a sprite sheet and memoizes the decoded result.
///
/// Every name is decoded at most once. Failed lookups are cached as `None`
/// so missing or broken entries are not retried.
pub struct SpriteAtlas {
    index: Option<AtlasIndex>,
    decoder: Option<Box<dyn RegionDecoder>>,
    /// `None` values record names that were looked up and had no result.
    cache: HashMap<String, Option<Bitmap>>,
    retina: bool,
    evicted: bool,
}

impl SpriteAtlas {
    /// Create an atlas from an index stream and an encoded image stream.
    ///
    /// Neither a broken index nor a broken image is fatal: the atlas is
    /// built in a degraded state and `get` returns `None`.
    pub fn new(json: impl Read, mut image: impl Read) -> Self {
        let index = load_index(json);

        let mut bytes = Vec::new();
        let decoder = match image.read_to_end(&mut bytes) {
            Ok(_) => open_decoder(SheetDecoder::from_bytes(&bytes)),
            Err(e) => {
                warn!("Error reading sprite image {}", e);
                None
            }
        };

        Self::from_parts(index, decoder)
    }

    /// Open an index file and an image file.
    pub fn open(json_path: impl AsRef<Path>, image_path: impl AsRef<Path>) -> Self {
        let index = match std::fs::File::open(json_path.as_ref()) {
            Ok(file) => load_index(file),
            Err(e) => {
                debug!("Opening {:?} {}", json_path.as_ref(), e);
                None
            }
        };
        let decoder = open_decoder(SheetDecoder::open(image_path));

        Self::from_parts(index, decoder)
    }

    /// Use an already parsed index with a custom region decoder
    pub fn with_decoder(index: AtlasIndex, decoder: Box<dyn RegionDecoder>) -> Self {
        Self::from_parts(Some(index), Some(decoder))
    }

    pub(crate) fn from_parts(index: Option<AtlasIndex>, decoder: Option<Box<dyn RegionDecoder>>) -> Self {
        Self {
            index,
            decoder,
            cache: HashMap::new(),
            retina: false,
            evicted: false,
        }
    }

    /// True if the icons are 2x resolution ("retina") icons.
    pub fn retina(&self) -> bool {
        self.retina
    }

    pub fn set_retina(&mut self, retina: bool) {
        self.retina = retina;
    }

    /// Retrieve an icon, decoding it on first use.
    pub fn get(&mut self, name: &str) -> Option<Bitmap> {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }

        let result = match (self.index.as_ref(), self.decoder.as_deref()) {
            (Some(index), Some(decoder)) => match index.lookup(name) {
                Some(meta) => match decode_icon(decoder, meta) {
                    Ok(icon) => Some(Arc::new(icon)),
                    Err(e) => {
                        error!("Error in sprite sheet for {} {}", name, e);
                        None
                    }
                },
                None => None,
            },
            _ => {
                error!("Setup error, can't decode {}", name);
                None
            }
        };

        if result.is_none() {
            warn!("Icon not found {}", name);
        }
        self.cache.insert(name.to_string(), result.clone());
        result
    }

    /// True if `name` has been requested with `get`, whether or not it was found.
    pub fn cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Raw index entry for `name`
    pub fn metadata(&self, name: &str) -> Option<&Metadata> {
        self.index.as_ref()?.lookup(name)
    }

    pub fn index(&self) -> Option<&AtlasIndex> {
        self.index.as_ref()
    }

    pub fn status(&self) -> AtlasStatus {
        if self.evicted {
            AtlasStatus::Evicted
        } else if self.index.is_none() {
            AtlasStatus::DegradedNoIndex
        } else if self.decoder.is_none() {
            AtlasStatus::DegradedNoImage
        } else {
            AtlasStatus::Ready
        }
    }

    /// Drop the decoder for good. Names already cached keep their value.
    pub(crate) fn release_decoder(&mut self) {
        self.decoder = None;
        self.evicted = true;
    }
}

fn decode_icon(decoder: &dyn RegionDecoder, meta: &Metadata) -> Result<RgbaImage, AtlasError> {
    let x = require_int(ICON_X, meta)?;
    let y = require_int(ICON_Y, meta)?;
    let width = require_int(ICON_WIDTH, meta)?;
    let height = require_int(ICON_HEIGHT, meta)?;
    let rect = Rect::from_fields(x, y, width, height)?;
    decoder.decode_region(rect)
}

pub(crate) fn load_index(json: impl Read) -> Option<AtlasIndex> {
    match AtlasIndex::from_reader(json) {
        Ok(index) => {
            debug!("Loaded sprite index with {} entries", index.len());
            Some(index)
        }
        Err(e) => {
            debug!("Opening {}", e);
            None
        }
    }
}

pub(crate) fn open_decoder(result: Result<SheetDecoder, AtlasError>) -> Option<Box<dyn RegionDecoder>> {
    match result {
        Ok(decoder) => Some(Box::new(decoder)),
        Err(e) => {
            warn!("Error decoding sprite image {}", e);
            None
        }
    }
}

/// Sprite atlas that owns an on-disk copy of its image
///
/// The image stream is spilled into a `CacheStore` file at construction. That
/// file is what lets `serialize`/`deserialize` move the atlas across processes
/// without the original image stream. Decoded icons are never persisted and
/// are recomputed on demand after a restore.
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::atlas::{load_index, open_decoder, AtlasStatus, Bitmap, SpriteAtlas};
use crate::decoder::SheetDecoder;
use crate::error::AtlasError;
use crate::index::{AtlasIndex, Metadata};
use crate::store::CacheStore;

/// Plain record written by `serialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasState {
    pub retina: bool,
    pub cache_path: Option<PathBuf>,
    pub index_json: String,
}

pub struct PersistentSpriteAtlas {
    atlas: SpriteAtlas,
    cache_path: Option<PathBuf>,
}

impl PersistentSpriteAtlas {
    /// Create an atlas backed by the configured cache directory.
    ///
    /// The image is spilled into `CacheStore::from_config()`, which is the
    /// user's cache directory unless the settings file says otherwise. Use
    /// `with_store` to pick the directory explicitly.
    pub fn new(json: impl Read, image: impl Read) -> Self {
        Self::with_store(&CacheStore::from_config(), json, image)
    }

    /// Create an atlas, spilling the image into `store`.
    ///
    /// If the spill fails the atlas keeps its index but cannot decode.
    pub fn with_store(store: &CacheStore, json: impl Read, mut image: impl Read) -> Self {
        let index = load_index(json);

        let (cache_path, decoder) = match store.spill(&mut image) {
            Ok(path) => {
                let decoder = open_decoder(SheetDecoder::open(&path));
                (Some(path), decoder)
            }
            Err(e) => {
                error!("Unable to create temp cache file {}", e);
                (None, None)
            }
        };

        Self {
            atlas: SpriteAtlas::from_parts(index, decoder),
            cache_path,
        }
    }

    /// Open an index file and an image file, spilling the image into `store`
    pub fn open(store: &CacheStore, json_path: impl AsRef<Path>, image_path: impl AsRef<Path>) -> Self {
        let json: Box<dyn Read> = match std::fs::File::open(json_path.as_ref()) {
            Ok(file) => Box::new(file),
            Err(e) => {
                debug!("Opening {:?} {}", json_path.as_ref(), e);
                Box::new(std::io::empty())
            }
        };

        match std::fs::File::open(image_path.as_ref()) {
            Ok(image) => Self::with_store(store, json, image),
            Err(e) => {
                warn!("Error opening sprite image {:?} {}", image_path.as_ref(), e);
                Self {
                    atlas: SpriteAtlas::from_parts(load_index(json), None),
                    cache_path: None,
                }
            }
        }
    }

    pub fn get(&mut self, name: &str) -> Option<Bitmap> {
        self.atlas.get(name)
    }

    pub fn cached(&self, name: &str) -> bool {
        self.atlas.cached(name)
    }

    pub fn metadata(&self, name: &str) -> Option<&Metadata> {
        self.atlas.metadata(name)
    }

    pub fn retina(&self) -> bool {
        self.atlas.retina()
    }

    pub fn set_retina(&mut self, retina: bool) {
        self.atlas.set_retina(retina);
    }

    pub fn status(&self) -> AtlasStatus {
        self.atlas.status()
    }

    pub fn index(&self) -> Option<&AtlasIndex> {
        self.atlas.index()
    }

    /// Path of the spilled image, if any
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Delete the spilled image.
    ///
    /// Afterwards only names already cached still resolve, and a serialized
    /// copy restores without an image.
    pub fn evict(&mut self) {
        if let Some(path) = self.cache_path.take() {
            if let Err(e) = CacheStore::remove(&path) {
                error!("Unable to remove cache file {:?} {}", path, e);
            }
        }
        self.atlas.release_decoder();
    }

    /// Snapshot of the persistable state
    pub fn state(&self) -> AtlasState {
        AtlasState {
            retina: self.atlas.retina(),
            cache_path: self.cache_path.clone(),
            index_json: self
                .atlas
                .index()
                .map(AtlasIndex::to_json)
                .unwrap_or_else(|| AtlasIndex::empty().to_json()),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, AtlasError> {
        Ok(serde_json::to_vec(&self.state())?)
    }

    /// Rebuild an atlas from `serialize` output.
    ///
    /// Only undecodable bytes are an error. A missing cache file gives an
    /// atlas that has its index but cannot decode.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, AtlasError> {
        let state: AtlasState = serde_json::from_slice(bytes)?;
        Ok(Self::restore(state))
    }

    pub fn restore(state: AtlasState) -> Self {
        let index = match AtlasIndex::from_str(&state.index_json) {
            Ok(index) => Some(index),
            Err(e) => {
                error!("Saved sprite index unreadable {}", e);
                None
            }
        };

        let decoder = match state.cache_path.as_deref() {
            Some(path) if CacheStore::exists(path) => open_decoder(SheetDecoder::open(path)),
            Some(path) => {
                error!("Saved input image file {:?} is gone", path);
                None
            }
            None => {
                error!("No saved input image file");
                None
            }
        };

        let mut atlas = SpriteAtlas::from_parts(index, decoder);
        atlas.set_retina(state.retina);
        Self {
            atlas,
            cache_path: state.cache_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AtlasSettings;
    use crate::test_support::{index_json, sheet_png};
    use tempfile::TempDir;

    fn persistent() -> (TempDir, PersistentSpriteAtlas) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("sprites"));
        let atlas = PersistentSpriteAtlas::with_store(
            &store,
            index_json().as_bytes(),
            sheet_png(64, 32).as_slice(),
        );
        (dir, atlas)
    }

    #[test]
    fn test_construction_spills_image() {
        let (dir, mut atlas) = persistent();
        let path = atlas.cache_path().unwrap().to_path_buf();
        assert!(path.starts_with(std::fs::canonicalize(dir.path()).unwrap()));
        assert_eq!(std::fs::read(&path).unwrap(), sheet_png(64, 32));
        assert_eq!(atlas.status(), AtlasStatus::Ready);

        let icon = atlas.get("aerialway_11").unwrap();
        assert_eq!(icon.dimensions(), (15, 15));
        assert!(atlas.cached("aerialway_11"));
    }

    #[test]
    fn test_construction_through_settings_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AtlasSettings {
            cache_dir: Some(dir.path().to_path_buf()),
            ..AtlasSettings::default()
        };
        let store = CacheStore::from_settings(&settings);
        let mut atlas = PersistentSpriteAtlas::with_store(
            &store,
            index_json().as_bytes(),
            sheet_png(64, 32).as_slice(),
        );

        let sprites_dir = std::fs::canonicalize(dir.path().join("sprites")).unwrap();
        assert!(atlas.cache_path().unwrap().starts_with(&sprites_dir));
        assert!(atlas.get("bank_11").is_some());

        atlas.evict();
        assert_eq!(std::fs::read_dir(&sprites_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let (_dir, mut atlas) = persistent();
        atlas.set_retina(true);
        let icon = atlas.get("aerialway_11").unwrap();
        assert!(atlas.get("test").is_none());

        let bytes = atlas.serialize().unwrap();
        let mut restored = PersistentSpriteAtlas::deserialize(&bytes).unwrap();

        assert!(restored.retina());
        assert_eq!(restored.cache_path(), atlas.cache_path());
        assert_eq!(restored.status(), AtlasStatus::Ready);
        // The decode cache starts empty after a restore
        assert!(!restored.cached("aerialway_11"));
        assert!(!restored.cached("test"));

        let again = restored.get("aerialway_11").unwrap();
        assert_eq!(again.dimensions(), icon.dimensions());
        assert_eq!(again.as_raw(), icon.as_raw());
        assert_eq!(restored.metadata("aerialway_11"), atlas.metadata("aerialway_11"));
        assert_eq!(restored.index(), atlas.index());
    }

    #[test]
    fn test_evict_disables_decoding() {
        let (_dir, mut atlas) = persistent();
        let before = atlas.get("aerialway_11").unwrap();
        let path = atlas.cache_path().unwrap().to_path_buf();

        atlas.evict();
        assert!(!CacheStore::exists(&path));
        assert_eq!(atlas.status(), AtlasStatus::Evicted);
        assert!(atlas.cache_path().is_none());

        assert!(atlas.get("bank_11").is_none());
        let after = atlas.get("aerialway_11").unwrap();
        assert!(std::sync::Arc::ptr_eq(&before, &after));
        assert!(atlas.metadata("bank_11").is_some());

        // Evicting twice is harmless
        atlas.evict();
        assert_eq!(atlas.status(), AtlasStatus::Evicted);
    }

    #[test]
    fn test_serialize_after_evict_restores_without_image() {
        let (_dir, mut atlas) = persistent();
        atlas.evict();

        let bytes = atlas.serialize().unwrap();
        let mut restored = PersistentSpriteAtlas::deserialize(&bytes).unwrap();
        assert_eq!(restored.status(), AtlasStatus::DegradedNoImage);
        assert!(restored.metadata("aerialway_11").is_some());
        assert!(restored.get("aerialway_11").is_none());
    }

    #[test]
    fn test_restore_with_deleted_file() {
        let (_dir, atlas) = persistent();
        let bytes = atlas.serialize().unwrap();
        std::fs::remove_file(atlas.cache_path().unwrap()).unwrap();

        let mut restored = PersistentSpriteAtlas::deserialize(&bytes).unwrap();
        assert_eq!(restored.status(), AtlasStatus::DegradedNoImage);
        assert!(restored.get("bank_11").is_none());
    }

    #[test]
    fn test_restore_without_path() {
        let state = AtlasState {
            retina: false,
            cache_path: None,
            index_json: index_json(),
        };
        let mut restored = PersistentSpriteAtlas::restore(state);
        assert_eq!(restored.status(), AtlasStatus::DegradedNoImage);
        assert!(restored.metadata("bank_11").is_some());
        assert!(restored.get("bank_11").is_none());
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let result = PersistentSpriteAtlas::deserialize(b"\x00\x01 not a record");
        assert!(matches!(result, Err(AtlasError::State(_))));
    }

    #[test]
    fn test_unparsable_index_serializes_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let atlas = PersistentSpriteAtlas::with_store(&store, &b"[]"[..], sheet_png(8, 8).as_slice());
        assert_eq!(atlas.status(), AtlasStatus::DegradedNoIndex);

        let mut restored = PersistentSpriteAtlas::deserialize(&atlas.serialize().unwrap()).unwrap();
        assert_eq!(restored.status(), AtlasStatus::Ready);
        assert!(restored.index().unwrap().is_empty());
        assert!(restored.get("anything").is_none());
    }

    #[test]
    fn test_corrupt_image_is_spilled_but_not_decodable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut atlas = PersistentSpriteAtlas::with_store(&store, index_json().as_bytes(), &b"garbage"[..]);

        assert!(atlas.cache_path().is_some());
        assert_eq!(atlas.status(), AtlasStatus::DegradedNoImage);
        assert!(atlas.metadata("aerialway_11").is_some());
        assert!(atlas.get("aerialway_11").is_none());
    }

    #[test]
    fn test_open_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("sprite.json");
        let png_path = dir.path().join("sprite.png");
        std::fs::write(&json_path, index_json()).unwrap();
        std::fs::write(&png_path, sheet_png(64, 32)).unwrap();
        let store = CacheStore::new(dir.path().join("cache"));

        let mut atlas = PersistentSpriteAtlas::open(&store, &json_path, &png_path);
        assert!(atlas.get("bank_11").is_some());

        let mut no_image = PersistentSpriteAtlas::open(&store, &json_path, dir.path().join("nope.png"));
        assert_eq!(no_image.status(), AtlasStatus::DegradedNoImage);
        assert!(no_image.cache_path().is_none());
        assert!(no_image.get("bank_11").is_none());
    }
}

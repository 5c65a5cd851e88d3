use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::config::CONFIG;
use crate::settings::AtlasSettings;

/// Directory holding spilled sprite images.
///
/// Every spill gets a fresh, uniquely named file. The store never deletes
/// files on its own; the owner of a path calls `remove` when done with it.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the process-wide configured cache directory.
    ///
    /// Unless the settings file overrides `cache_dir`, this is the user's
    /// cache directory (e.g. `~/.cache/sprite-atlas/sprites` on Linux).
    pub fn from_config() -> Self {
        Self::new(CONFIG.cache_dir.clone())
    }

    /// Store rooted at the cache directory `settings` resolves to
    pub fn from_settings(settings: &AtlasSettings) -> Self {
        Self::new(settings.resolved_cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `reader` byte-for-byte into a new file in the store and return its absolute path.
    pub fn spill(&self, reader: &mut impl Read) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("sprite-")
            .tempfile_in(&self.dir)?;
        let written = io::copy(reader, &mut file)?;
        file.flush()?;

        let (_, path) = file.keep().map_err(|e| e.error)?;
        let path = fs::canonicalize(&path).unwrap_or(path);
        debug!("Spilled {} bytes to {:?}", written, path);
        Ok(path)
    }

    pub fn exists(path: &Path) -> bool {
        fs::metadata(path).map(|metadata| metadata.is_file()).unwrap_or(false)
    }

    /// Delete a spilled file. A file that is already gone is not an error.
    pub fn remove(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed cache file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

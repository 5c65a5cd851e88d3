use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use log::{debug, info, warn, error};

const APP_DIR: &str = "sprite-atlas";

/// User settings for the sprite cache, read from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasSettings {
    /// Root of the sprite cache. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Sub-directory of `cache_dir` that receives spilled sprite images
    #[serde(default = "default_cache_subdir")]
    pub cache_subdir: String,
}

fn default_cache_subdir() -> String {
    "sprites".to_string()
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_subdir: default_cache_subdir(),
        }
    }
}

impl AtlasSettings {
    /// Get the path to the settings file
    /// On macOS: ~/Library/Application Support/sprite-atlas/settings.yaml
    /// On Linux: ~/.config/sprite-atlas/settings.yaml
    /// On Windows: C:\Users\<user>\AppData\Roaming\sprite-atlas\settings.yaml
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."));

        config_dir.join(APP_DIR).join("settings.yaml")
    }

    /// Load settings from the YAML file
    /// If custom_path is provided, uses that path; otherwise uses the default settings path
    pub fn load(custom_path: Option<&str>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p);
                PathBuf::from(p)
            }
            None => Self::settings_path(),
        };

        if !path.exists() {
            debug!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str::<AtlasSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    debug!("Settings: cache_dir={:?}, cache_subdir={}", settings.cache_dir, settings.cache_subdir);
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file at {:?}: {}", path, e);
                    warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to `path`, or to the default settings path
    pub fn save(&self, path: Option<&str>) -> Result<(), String> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::settings_path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create settings directory: {}", e))?;
            }
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, yaml)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Directory spilled sprite images are written to
    pub fn resolved_cache_dir(&self) -> PathBuf {
        let root = self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR))
        });
        root.join(&self.cache_subdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let settings = AtlasSettings::load(path.to_str());
        assert_eq!(settings, AtlasSettings::default());
        assert_eq!(settings.cache_subdir, "sprites");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "cache_dir: /var/cache/icons\n").unwrap();

        let settings = AtlasSettings::load(path.to_str());
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/var/cache/icons")));
        assert_eq!(settings.resolved_cache_dir(), PathBuf::from("/var/cache/icons/sprites"));
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "cache_subdir: [unclosed\n").unwrap();
        assert_eq!(AtlasSettings::load(path.to_str()), AtlasSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.yaml");
        let settings = AtlasSettings {
            cache_dir: Some(dir.path().to_path_buf()),
            cache_subdir: "icons".to_string(),
        };
        settings.save(path.to_str()).unwrap();
        assert_eq!(AtlasSettings::load(path.to_str()), settings);
    }
}

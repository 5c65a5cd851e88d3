use std::path::PathBuf;

use once_cell::sync::Lazy;
use crate::settings::AtlasSettings;

pub struct Config {
    pub cache_dir: PathBuf,     // Directory the persistent atlas spills sprite images to
}

impl Config {
    pub fn from_settings(settings: &AtlasSettings) -> Self {
        Config {
            cache_dir: settings.resolved_cache_dir(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    // Load settings from YAML file
    Config::from_settings(&AtlasSettings::load(None))
});

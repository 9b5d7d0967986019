//! Data directory layout.

use std::path::{Path, PathBuf};

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = ".cacho";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CACHO_DATA_DIR";

/// Where the scorekeeper keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
        }
    }

    /// Session cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Document store directory.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let config = Config::new("/tmp/scores");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/scores/cache"));
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/scores/store"));
        assert_eq!(Config::default().data_dir(), Path::new(".cacho"));
    }
}

//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a StrataKV engine instance
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the sealed segment files.
    ///
    /// Scanned non-recursively at open; unrecognized files are ignored.
    pub data_dir: PathBuf,

    /// Max size of the memtable byte estimate before flush (in bytes).
    ///
    /// Also bounds the size of segments produced by flush and compaction.
    pub flush_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            flush_threshold: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the flush threshold (in bytes)
    pub fn flush_threshold(mut self, bytes: u64) -> Self {
        self.config.flush_threshold = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

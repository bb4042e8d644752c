//! # Codec Configuration
//!
//! Limits and behaviour switches shared by the writer and the reader, with
//! environment overrides for deployment-specific tuning.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_NESTING_DEPTH;

/// Codec limits and switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Deepest sub-message nesting accepted on read and write
    pub max_nesting_depth: usize,

    /// Largest envelope total size accepted on read (header included)
    pub max_message_size: u32,

    /// Keep sub-messages encoded on read when the source can skip
    pub lazy_reads: bool,

    /// Replace names with taxonomy ordinals on write
    pub compress_names: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_message_size: u32::MAX,
            lazy_reads: false,
            compress_names: true,
        }
    }
}

impl CodecConfig {
    /// Load configuration from environment variables with fallback to defaults
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FUDGE_MAX_NESTING_DEPTH") {
            if let Ok(depth) = val.parse() {
                config.max_nesting_depth = depth;
            }
        }

        if let Ok(val) = std::env::var("FUDGE_MAX_MESSAGE_SIZE") {
            if let Ok(size) = val.parse() {
                config.max_message_size = size;
            }
        }

        if let Ok(val) = std::env::var("FUDGE_LAZY_READS") {
            if let Ok(lazy) = val.parse() {
                config.lazy_reads = lazy;
            }
        }

        if let Ok(val) = std::env::var("FUDGE_COMPRESS_NAMES") {
            if let Ok(compress) = val.parse() {
                config.compress_names = compress;
            }
        }

        config
    }

    pub fn with_lazy_reads(mut self, lazy_reads: bool) -> Self {
        self.lazy_reads = lazy_reads;
        self
    }

    pub fn with_compress_names(mut self, compress_names: bool) -> Self {
        self.compress_names = compress_names;
        self
    }

    pub fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: u32) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}

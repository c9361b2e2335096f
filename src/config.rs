//! Configuration for loading and listing.
//!
//! Defaults give lowercase hex operands and a 15-octet byte column; a JSON
//! file can override any field and CLI flags override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::disasm::driver::MAX_INSTRUCTION_LENGTH;
use crate::disasm::iced::DEFAULT_FORMAT_BUFFER_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasmConfig {
    /// How the input file is brought into memory.
    pub load: LoadConfig,
    /// Listing options.
    pub output: OutputConfig,
}

impl DisasmConfig {
    /// Parse and validate a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load.max_file_size == 0 {
            return Err(ConfigError::Invalid("load.max_file_size must be non-zero".into()));
        }
        if self.output.format_buffer_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "output.format_buffer_size must be at least 2, got {}",
                self.output.format_buffer_size
            )));
        }
        if self.output.byte_slots == 0 || self.output.byte_slots > 64 {
            return Err(ConfigError::Invalid(format!(
                "output.byte_slots must be within 1..=64, got {}",
                self.output.byte_slots
            )));
        }
        Ok(())
    }
}

/// File loading limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Largest file accepted, in bytes.
    pub max_file_size: u64,
    /// Map the file read-only instead of reading it into a heap buffer.
    pub use_mmap: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
            use_mmap: false,
        }
    }
}

/// Listing format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Uppercase hex digits in operands.
    pub uppercase_hex: bool,
    /// Demangle MSVC names in labels and operands.
    pub demangle: bool,
    /// Capacity of the formatted instruction text, terminator included.
    pub format_buffer_size: usize,
    /// Octets the byte column is padded to.
    pub byte_slots: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            uppercase_hex: false,
            demangle: false,
            format_buffer_size: DEFAULT_FORMAT_BUFFER_SIZE,
            byte_slots: MAX_INSTRUCTION_LENGTH,
        }
    }
}

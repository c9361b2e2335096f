//! Error types for image loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not open file \"{path}\": {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { limit: u64, found: u64 },

    #[error("Failed to allocate {size} bytes on the heap")]
    Allocation { size: u64 },

    #[error("Could not read file \"{path}\": {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not read file \"{path}\": expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Could not map file \"{path}\": {source}")]
    Map {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;

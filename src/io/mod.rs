//! Bounded loading of an image file into memory.
//!
//! The whole file is either read into one exactly-sized heap buffer or mapped
//! read-only. Either way the bytes are immutable for the rest of the run.

pub mod error;

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, warn};

pub use crate::io::error::{LoadError, Result};
use crate::config::LoadConfig;

/// Backing storage for the image bytes
pub enum ImageBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for ImageBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ImageBytes::Owned(v) => v,
            ImageBytes::Mapped(m) => m,
        }
    }
}

/// A loaded image file
pub struct ImageFile {
    path: PathBuf,
    bytes: ImageBytes,
}

impl ImageFile {
    /// Open `path` and bring its contents into memory under `limits`.
    pub fn open<P: AsRef<Path>>(path: P, limits: &LoadConfig) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;
        let size = file.metadata().map_err(open_err)?.len();

        debug!(
            path = %path.display(),
            size,
            limit = limits.max_file_size,
            mmap = limits.use_mmap,
            "Opening image file"
        );

        if size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(LoadError::FileTooLarge {
                limit: limits.max_file_size,
                found: size,
            });
        }

        // Empty files cannot be mapped; they fall through to an empty buffer
        let bytes = if limits.use_mmap && size > 0 {
            // Safety: read-only map of a regular file; the bytes are never written through.
            let map = unsafe { Mmap::map(&file) }.map_err(|source| LoadError::Map {
                path: path.to_path_buf(),
                source,
            })?;
            ImageBytes::Mapped(map)
        } else {
            ImageBytes::Owned(read_exact_size(file, path, size)?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.bytes, ImageBytes::Mapped(_))
    }
}

fn read_exact_size(file: File, path: &Path, size: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(size).map_err(|_| LoadError::Allocation { size })?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| LoadError::Allocation { size })?;

    // Bounded by the size observed at open; growth after that is ignored
    file.take(size)
        .read_to_end(&mut buffer)
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if buffer.len() as u64 != size {
        return Err(LoadError::ShortRead {
            path: path.to_path_buf(),
            expected: size,
            actual: buffer.len() as u64,
        });
    }
    Ok(buffer)
}

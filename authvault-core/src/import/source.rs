//! Resettable in-memory view over the bytes of an import file.
//!
//! Format detection tries several parsers against the same file, so the
//! whole file is read into memory once and every trial starts from offset 0.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::ImportError;

/// Default upper bound for import files (10 MiB)
pub const DEFAULT_MAX_IMPORT_SIZE: u64 = 10 * 1024 * 1024;

/// Owned file contents with a read cursor.
///
/// The buffer is zeroized on drop because it may hold plaintext backups.
/// A source is owned by exactly one import attempt at a time.
pub struct ByteSource {
    data: Zeroizing<Vec<u8>>,
    position: usize,
    resets: usize,
}

impl ByteSource {
    /// Wraps bytes that are already in memory
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: Zeroizing::new(data),
            position: 0,
            resets: 0,
        }
    }

    /// Drains `reader` into a new source, rejecting inputs above `limit` bytes
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ReadError`] on I/O failure and
    /// [`ImportError::FileTooLarge`] when the input exceeds `limit`.
    pub fn from_reader<R: Read>(reader: R, limit: u64) -> Result<Self, ImportError> {
        let mut data = Zeroizing::new(Vec::new());
        reader
            .take(limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| ImportError::ReadError {
                path: "<stream>".into(),
                reason: e.to_string(),
            })?;

        let size = data.len() as u64;
        if size > limit {
            return Err(ImportError::FileTooLarge { size, limit });
        }
        Ok(Self {
            data,
            position: 0,
            resets: 0,
        })
    }

    /// Reads a file into a new source
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::FileNotFound`] if the path does not exist,
    /// [`ImportError::FileTooLarge`] if it exceeds `limit`, and
    /// [`ImportError::ReadError`] for any other I/O failure.
    pub fn from_path(path: &Path, limit: u64) -> Result<Self, ImportError> {
        let metadata = fs::metadata(path).map_err(|e| map_io_error(path, &e))?;
        if metadata.len() > limit {
            return Err(ImportError::FileTooLarge {
                size: metadata.len(),
                limit,
            });
        }
        let data = fs::read(path).map_err(|e| map_io_error(path, &e))?;
        tracing::debug!(path = %path.display(), size = data.len(), "Read import file");
        Ok(Self::from_bytes(data))
    }

    /// Async variant of [`ByteSource::from_path`] using tokio's file I/O
    ///
    /// # Errors
    ///
    /// Same as [`ByteSource::from_path`].
    pub async fn from_path_async(path: &Path, limit: u64) -> Result<Self, ImportError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io_error(path, &e))?;
        if metadata.len() > limit {
            return Err(ImportError::FileTooLarge {
                size: metadata.len(),
                limit,
            });
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| map_io_error(path, &e))?;
        Ok(Self::from_bytes(data))
    }

    /// Rewinds to the first byte
    pub fn reset(&mut self) {
        self.position = 0;
        self.resets += 1;
    }

    /// Reads everything from the current position to the end
    pub fn read_remaining(&mut self) -> &[u8] {
        let start = self.position;
        self.position = self.data.len();
        &self.data[start..]
    }

    /// Returns the full contents regardless of the cursor
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the current read offset
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns how many times the source has been rewound
    #[must_use]
    pub const fn reset_count(&self) -> usize {
        self.resets
    }

    /// Returns the total size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the source holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("len", &self.data.len())
            .field("position", &self.position)
            .field("resets", &self.resets)
            .finish()
    }
}

fn map_io_error(path: &Path, error: &io::Error) -> ImportError {
    if error.kind() == io::ErrorKind::NotFound {
        ImportError::FileNotFound(path.to_path_buf())
    } else {
        ImportError::ReadError {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }
}

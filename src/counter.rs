//! Persistent image counter.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Value used when no counter has been persisted yet.
pub const FIRST_IMAGE_NUMBER: u64 = 1;

/// Error type for counter persistence.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The counter file could not be read or written.
    #[error("counter file {}: {source}", path.display())]
    Io {
        /// Counter file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The counter file does not hold an integer.
    #[error("counter file {} holds {content:?}, expected an integer", path.display())]
    Parse {
        /// Counter file.
        path: PathBuf,
        /// What was found instead.
        content: String,
    },
}

/// Reads and writes the next image number as plain text.
///
/// Writes are not atomic. The counter only names files, so a torn write
/// costs at most a duplicated number in a timestamp-qualified name.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    /// Create a store backed by `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted counter, or [`FIRST_IMAGE_NUMBER`] if the file is absent.
    pub fn load(&self) -> Result<u64, CounterError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FIRST_IMAGE_NUMBER),
            Err(source) => {
                return Err(CounterError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        text.trim().parse().map_err(|_| CounterError::Parse {
            path: self.path.clone(),
            content: text.trim().to_owned(),
        })
    }

    /// Overwrite the persisted counter with `value`.
    pub fn save(&self, value: u64) -> Result<(), CounterError> {
        fs::write(&self.path, value.to_string()).map_err(|source| CounterError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

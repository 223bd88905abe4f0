//! Error types shared by the catalog, playlist and library layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::TrackId;
use crate::playlist::PlaylistId;

/// Failure to read or write a persisted document.
///
/// These indicate corruption risk and abort the enclosing operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed document {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("playlist {0} not found")]
    PlaylistNotFound(PlaylistId),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LibraryError {
    /// Storage failures are surfaced apart from not-found and input errors.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::{LibraryError, StoreError};

use super::resolver::ResolveError;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("a download is already running")]
    Busy,

    #[error("no suitable match for '{0}'")]
    NoSuitableMatch(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not move downloaded file to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("nothing from '{0}' could be downloaded")]
    NothingDownloaded(String),
}

impl DownloadError {
    /// Failures confined to one item. A batch records these and moves on;
    /// anything else aborts it.
    pub fn is_item_failure(&self) -> bool {
        matches!(self, Self::NoSuitableMatch(_) | Self::Resolve(_))
    }
}

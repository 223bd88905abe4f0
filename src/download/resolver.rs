use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// A remote track a [`TrackResolver`] can fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// The resolver's own identifier, only used to name the staging file.
    pub remote_id: String,
    pub title: String,
    /// `None` when the remote side did not report a length.
    pub duration: Option<Duration>,
    pub url: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Finds and retrieves remote audio.
///
/// Calls block; the pipeline checks for cancellation between them.
pub trait TrackResolver: Send + Sync {
    /// Candidates for a free-text query, best first.
    fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError>;

    /// Metadata for a single URL.
    fn probe(&self, url: &str) -> Result<Candidate, ResolveError>;

    /// Write the audio for `candidate` to `destination` (or a path derived from
    /// it) and return where the file ended up.
    fn fetch(&self, candidate: &Candidate, destination: &Path) -> Result<PathBuf, ResolveError>;
}

/// One track as described by a remote catalog: enough to build a search query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl TrackDescriptor {
    pub fn new(title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            artist: artist.trim().to_string(),
            album: album.trim().to_string(),
        }
    }

    /// Non-empty parts joined with spaces, followed by `suffix`.
    pub fn query(&self, suffix: &str) -> String {
        [
            self.title.as_str(),
            self.artist.as_str(),
            self.album.as_str(),
            suffix.trim(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// `"<title> - <artist>"`, or just the title when the artist is unknown.
    pub fn display_title(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteCollection {
    pub name: String,
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteItem {
    Track(TrackDescriptor),
    Collection(RemoteCollection),
}

/// Turns a link to a remote catalog into track descriptors.
pub trait CollectionSource: Send + Sync {
    fn resolve(&self, url: &str) -> Result<RemoteItem, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_skips_empty_parts() {
        let full = TrackDescriptor::new("Song", "Band", "Record");
        assert_eq!(full.query("official audio"), "Song Band Record official audio");

        let bare = TrackDescriptor::new("Song", "", "");
        assert_eq!(bare.query(""), "Song");
        assert_eq!(bare.query("  official audio "), "Song official audio");
    }

    #[test]
    fn display_title_pairs_title_and_artist() {
        assert_eq!(TrackDescriptor::new("Song", "Band", "x").display_title(), "Song - Band");
        assert_eq!(TrackDescriptor::new("Song", " ", "").display_title(), "Song");
    }
}

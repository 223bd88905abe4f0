use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::TrackId;
use crate::error::LibraryError;

/// Playlist identifier of the form `<n>L`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn from_seq(n: u64) -> Self {
        Self(format!("{n}L"))
    }

    pub fn seq(&self) -> u64 {
        self.0
            .trim_end_matches('L')
            .parse()
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accepts `3L`, `3l` and a bare `3`.
impl FromStr for PlaylistId {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_suffix(|c: char| c == 'L' || c == 'l').unwrap_or(s);
        match digits.parse::<u64>() {
            Ok(n) if n > 0 && digits.bytes().all(|b| b.is_ascii_digit()) => Ok(Self::from_seq(n)),
            _ => Err(LibraryError::InvalidInput(format!(
                "'{s}' is not a playlist id (expected e.g. 3L)"
            ))),
        }
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted playlist document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<TrackId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCounter {
    pub next_seq: u64,
}

impl Default for PlaylistCounter {
    fn default() -> Self {
        Self { next_seq: 1 }
    }
}

#[derive(Clone, Debug)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub len: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditAction {
    Add,
    Remove,
}

impl FromStr for EditAction {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" | "rm" => Ok(Self::Remove),
            other => Err(LibraryError::InvalidInput(format!(
                "action must be 'add' or 'remove', got '{other}'"
            ))),
        }
    }
}

/// What an `edit` actually did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditReport {
    /// IDs added (for `add`) or removed (for `remove`).
    pub applied: Vec<TrackId>,
    /// IDs ignored because no asset exists for them.
    pub skipped: Vec<TrackId>,
    /// Membership size after the edit.
    pub len: usize,
}

/// Result of comparing a playlist's membership against the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckReport {
    pub id: PlaylistId,
    pub name: String,
    pub present: Vec<TrackId>,
    pub missing: Vec<TrackId>,
}

impl CheckReport {
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Outcome of a check whose reconciliation step was offered to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub report: CheckReport,
    /// Number of entries pruned, or `None` when nothing was pruned
    /// (intact playlist or the caller declined).
    pub pruned: Option<usize>,
}

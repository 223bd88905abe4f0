use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// Stable local identifier of a downloaded track: a decimal sequence number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn from_seq(n: u64) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn seq(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

/// Accepts decimal digits; `007` names the same track as `7`.
impl FromStr for TrackId {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<u64>() {
            Ok(n) if s.bytes().all(|b| b.is_ascii_digit()) => Ok(Self::from_seq(n)),
            _ => Err(LibraryError::InvalidInput(format!(
                "'{s}' is not a track id (expected digits, e.g. 12)"
            ))),
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Numeric order so listings read 1, 2, 10 rather than 1, 10, 2.
impl Ord for TrackId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.seq(), other.seq()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TrackId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Metadata kept for each track in the index document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub added_date: String,
}

pub type MetadataIndex = BTreeMap<TrackId, TrackRecord>;

/// Persisted allocator state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    pub next_id: u64,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

/// A track found on disk, joined with whatever metadata is known about it.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub id: TrackId,
    pub path: PathBuf,
    pub record: Option<TrackRecord>,
    pub duration: Option<Duration>,
}

impl CatalogEntry {
    pub fn title(&self) -> String {
        self.record
            .as_ref()
            .map(|r| r.title.clone())
            .unwrap_or_else(|| placeholder_title(&self.id))
    }
}

pub fn placeholder_title(id: &TrackId) -> String {
    format!("Track {id}")
}

const CONTAINER_SUFFIXES: [&str; 5] = [".mp3", ".webm", ".m4a", ".opus", ".ogg"];

/// Strip container-extension suffixes that remote titles sometimes carry.
pub fn clean_title(raw: &str) -> String {
    let mut title = raw.trim();
    loop {
        let stripped = CONTAINER_SUFFIXES.iter().find_map(|suffix| {
            let cut = title.len().checked_sub(suffix.len())?;
            let tail = title.get(cut..)?;
            tail.eq_ignore_ascii_case(suffix).then(|| &title[..cut])
        });
        match stripped {
            Some(rest) => title = rest.trim_end(),
            None => break,
        }
    }
    title.to_string()
}

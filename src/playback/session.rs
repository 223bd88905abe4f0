use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::catalog::TrackId;

/// State of one playback session, owned by its monitor thread.
///
/// Picks are uniform among tracks not yet played in the current cycle; once
/// every track has played the cycle starts over.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    playlist: Vec<TrackId>,
    played: HashSet<TrackId>,
}

impl PlaybackSession {
    pub fn new(playlist: Vec<TrackId>) -> Self {
        Self {
            playlist,
            played: HashSet::new(),
        }
    }

    /// A session with nothing to advance to: it ends with its first track.
    pub fn single() -> Self {
        Self::default()
    }

    pub fn pick_next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TrackId> {
        if self.playlist.is_empty() {
            return None;
        }
        let mut pool: Vec<&TrackId> = self
            .playlist
            .iter()
            .filter(|id| !self.played.contains(*id))
            .collect();
        if pool.is_empty() {
            self.played.clear();
            pool = self.playlist.iter().collect();
        }
        let next = (*pool.choose(rng)?).clone();
        self.played.insert(next.clone());
        Some(next)
    }
}

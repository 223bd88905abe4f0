use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::catalog::{TrackId, TrackLookup};
use crate::error::{LibraryError, Result, StoreError};
use crate::store::JsonDocument;

use super::model::{
    CheckReport, EditAction, EditReport, Playlist, PlaylistCounter, PlaylistId, PlaylistSummary,
    Reconciliation,
};

const COUNTER_FILE: &str = "counter.json";

/// Named, ordered collections of track IDs, one JSON document per playlist.
///
/// Membership is a soft reference: the store never checks the catalog on its
/// own, callers pass a [`TrackLookup`] where validation is wanted.
pub struct PlaylistStore {
    lists_dir: PathBuf,
    counter: JsonDocument<PlaylistCounter>,
    docs: Mutex<HashMap<PlaylistId, Arc<JsonDocument<Playlist>>>>,
}

impl PlaylistStore {
    pub fn open(lists_dir: impl Into<PathBuf>) -> std::result::Result<Self, StoreError> {
        let lists_dir = lists_dir.into();
        fs::create_dir_all(&lists_dir).map_err(|e| StoreError::io(&lists_dir, e))?;

        let store = Self {
            counter: JsonDocument::new(lists_dir.join(COUNTER_FILE)),
            lists_dir,
            docs: Mutex::new(HashMap::new()),
        };

        if !store.counter.exists() {
            // Directories written before the counter existed: continue after the highest ID.
            let next_seq = store.existing_ids()?.iter().map(PlaylistId::seq).max().unwrap_or(0) + 1;
            store.counter.save(&PlaylistCounter { next_seq })?;
        }
        Ok(store)
    }

    /// Create a playlist and return its new ID.
    pub fn create(&self, name: &str, songs: Vec<TrackId>) -> std::result::Result<PlaylistId, StoreError> {
        let count_based = PlaylistId::from_seq(self.existing_ids()?.len() as u64 + 1);

        let id = loop {
            let seq = self.counter.with_lock(|c| {
                let seq = c.next_seq.max(1);
                c.next_seq = seq + 1;
                seq
            })?;
            let candidate = PlaylistId::from_seq(seq);
            // A hand-made file may already occupy the slot.
            if !self.doc(&candidate).exists() {
                break candidate;
            }
        };
        if id != count_based {
            info!("new playlist gets id {id}; a count-based id would have reused {count_based}");
        }

        self.doc(&id).save(&Playlist {
            name: name.to_string(),
            songs,
        })?;
        info!("created playlist {id} ({name})");
        Ok(id)
    }

    pub fn get(&self, id: &PlaylistId) -> Result<Playlist> {
        let doc = self.doc(id);
        if !doc.exists() {
            return Err(LibraryError::PlaylistNotFound(id.clone()));
        }
        Ok(doc.load()?)
    }

    /// Summaries of every playlist, in ID order.
    pub fn list(&self) -> Result<Vec<PlaylistSummary>> {
        let mut out = Vec::new();
        for id in self.existing_ids()? {
            let playlist = self.doc(&id).load()?;
            out.push(PlaylistSummary {
                id,
                name: playlist.name,
                len: playlist.songs.len(),
            });
        }
        Ok(out)
    }

    /// Add or remove `ids`. IDs without an asset are skipped with a warning.
    pub fn edit(
        &self,
        id: &PlaylistId,
        action: EditAction,
        ids: &[TrackId],
        lookup: &impl TrackLookup,
    ) -> Result<EditReport> {
        let (valid, skipped): (Vec<TrackId>, Vec<TrackId>) =
            ids.iter().cloned().partition(|t| lookup.exists(t));
        for t in &skipped {
            warn!("track {t} does not exist; skipped");
        }

        let outcome = self.doc(id).with_existing(|playlist| {
            let mut applied = Vec::new();
            match action {
                EditAction::Add => {
                    for t in valid {
                        if !playlist.songs.contains(&t) {
                            playlist.songs.push(t.clone());
                            applied.push(t);
                        }
                    }
                }
                EditAction::Remove => {
                    for t in valid {
                        if playlist.songs.contains(&t) && !applied.contains(&t) {
                            applied.push(t);
                        }
                    }
                    playlist.songs.retain(|t| !applied.contains(t));
                }
            }
            (applied, playlist.songs.len())
        })?;

        let (applied, len) = outcome.ok_or_else(|| LibraryError::PlaylistNotFound(id.clone()))?;
        Ok(EditReport {
            applied,
            skipped,
            len,
        })
    }

    pub fn delete(&self, id: &PlaylistId) -> Result<()> {
        let removed = self.doc(id).remove()?;
        if let Ok(mut docs) = self.docs.lock() {
            docs.remove(id);
        }
        if !removed {
            return Err(LibraryError::PlaylistNotFound(id.clone()));
        }
        info!("deleted playlist {id}");
        Ok(())
    }

    /// Compare membership against `lookup` without changing anything.
    pub fn check(&self, id: &PlaylistId, lookup: &impl TrackLookup) -> Result<CheckReport> {
        let playlist = self.get(id)?;
        let (present, missing): (Vec<TrackId>, Vec<TrackId>) =
            playlist.songs.into_iter().partition(|t| lookup.exists(t));
        Ok(CheckReport {
            id: id.clone(),
            name: playlist.name,
            present,
            missing,
        })
    }

    /// Run [`check`](Self::check) and, if tracks are missing and `confirm` agrees,
    /// drop them from the persisted membership.
    pub fn reconcile(
        &self,
        id: &PlaylistId,
        lookup: &impl TrackLookup,
        confirm: impl FnOnce(&CheckReport) -> bool,
    ) -> Result<Reconciliation> {
        let report = self.check(id, lookup)?;
        if report.is_intact() || !confirm(&report) {
            return Ok(Reconciliation {
                report,
                pruned: None,
            });
        }

        let pruned = self
            .doc(id)
            .with_existing(|playlist| {
                let before = playlist.songs.len();
                playlist.songs.retain(|t| !report.missing.contains(t));
                before - playlist.songs.len()
            })?
            .ok_or_else(|| LibraryError::PlaylistNotFound(id.clone()))?;
        info!("pruned {pruned} missing track(s) from playlist {id}");
        Ok(Reconciliation {
            report,
            pruned: Some(pruned),
        })
    }

    /// Drop `track` from every playlist. Returns the playlists that changed.
    pub fn cascade_remove(&self, track: &TrackId) -> Result<Vec<PlaylistId>> {
        let mut touched = Vec::new();
        for id in self.existing_ids()? {
            let doc = self.doc(&id);
            if !doc.load()?.songs.contains(track) {
                continue;
            }
            let changed = doc.with_existing(|playlist| {
                let before = playlist.songs.len();
                playlist.songs.retain(|t| t != track);
                before != playlist.songs.len()
            })?;
            if changed == Some(true) {
                touched.push(id);
            }
        }
        Ok(touched)
    }

    fn doc(&self, id: &PlaylistId) -> Arc<JsonDocument<Playlist>> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.entry(id.clone())
            .or_insert_with(|| Arc::new(JsonDocument::new(self.lists_dir.join(format!("{id}.json")))))
            .clone()
    }

    /// IDs of the playlist documents present on disk, sorted by sequence number.
    fn existing_ids(&self) -> std::result::Result<Vec<PlaylistId>, StoreError> {
        let entries =
            fs::read_dir(&self.lists_dir).map_err(|e| StoreError::io(&self.lists_dir, e))?;
        let mut ids: Vec<PlaylistId> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                let id: PlaylistId = stem.parse().ok()?;
                // Only canonical names count; "3" or "3l" on disk are not ours.
                (id.as_str() == stem).then_some(id)
            })
            .collect();
        ids.sort_by_key(PlaylistId::seq);
        Ok(ids)
    }
}

//! The on-disk library: one catalog plus one playlist store.
//!
//! Operations spanning both stores live here, most importantly track deletion,
//! which cascades into every playlist so membership stays consistent.

use std::path::Path;

use log::info;

use crate::catalog::{Catalog, TrackId};
use crate::config::Settings;
use crate::error::{LibraryError, Result};
use crate::playlist::{CheckReport, EditAction, EditReport, PlaylistId, PlaylistStore, Reconciliation};

pub struct Library {
    pub catalog: Catalog,
    pub playlists: PlaylistStore,
}

impl Library {
    pub fn open(songs_dir: &Path, lists_dir: &Path, extension: &str) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::open(songs_dir, extension)?,
            playlists: PlaylistStore::open(lists_dir)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::open(
            &settings.songs_dir(),
            &settings.lists_dir(),
            &settings.library.audio_format,
        )
    }

    /// Delete a track's asset and metadata, then drop it from every playlist.
    ///
    /// Returns the playlists that lost the track.
    pub fn delete_track(&self, id: &TrackId) -> Result<Vec<PlaylistId>> {
        if !self.catalog.delete(id)? {
            return Err(LibraryError::TrackNotFound(id.clone()));
        }
        let touched = self.playlists.cascade_remove(id)?;
        if !touched.is_empty() {
            info!("track {id} removed from {} playlist(s)", touched.len());
        }
        Ok(touched)
    }

    pub fn edit_playlist(
        &self,
        id: &PlaylistId,
        action: EditAction,
        tracks: &[TrackId],
    ) -> Result<EditReport> {
        self.playlists.edit(id, action, tracks, &self.catalog)
    }

    pub fn check_playlist(&self, id: &PlaylistId) -> Result<CheckReport> {
        self.playlists.check(id, &self.catalog)
    }

    pub fn reconcile_playlist(
        &self,
        id: &PlaylistId,
        confirm: impl FnOnce(&CheckReport) -> bool,
    ) -> Result<Reconciliation> {
        self.playlists.reconcile(id, &self.catalog, confirm)
    }
}

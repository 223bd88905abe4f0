use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::StoreError;
use crate::store::JsonDocument;

use super::model::{
    CatalogEntry, IdCounter, MetadataIndex, TrackId, TrackRecord, clean_title, placeholder_title,
};
use super::scan::scan_assets;

const METADATA_FILE: &str = "metadata.json";
const COUNTER_FILE: &str = "counter.json";

/// Existence checks against the catalog, as needed by the playlist store.
pub trait TrackLookup {
    fn exists(&self, id: &TrackId) -> bool;
}

/// Owns the songs directory: audio assets, the metadata index and the ID allocator.
pub struct Catalog {
    songs_dir: PathBuf,
    extension: String,
    index: JsonDocument<MetadataIndex>,
    counter: JsonDocument<IdCounter>,
}

impl Catalog {
    /// Open (creating if needed) the catalog rooted at `songs_dir`.
    ///
    /// Assets are expected at `<songs_dir>/<id>.<extension>`.
    pub fn open(songs_dir: impl Into<PathBuf>, extension: &str) -> Result<Self, StoreError> {
        let songs_dir = songs_dir.into();
        fs::create_dir_all(&songs_dir).map_err(|e| StoreError::io(&songs_dir, e))?;

        let counter = JsonDocument::new(songs_dir.join(COUNTER_FILE));
        if !counter.exists() {
            counter.save(&IdCounter::default())?;
            debug!("initialised id counter in {}", songs_dir.display());
        }

        Ok(Self {
            index: JsonDocument::new(songs_dir.join(METADATA_FILE)),
            counter,
            extension: extension.trim_start_matches('.').to_string(),
            songs_dir,
        })
    }

    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn asset_path(&self, id: &TrackId) -> PathBuf {
        self.songs_dir.join(format!("{id}.{}", self.extension))
    }

    /// Hand out the next track ID. The counter is on disk before this returns.
    pub fn allocate_id(&self) -> Result<TrackId, StoreError> {
        let id = self.counter.with_lock(|c| {
            let id = c.next_id.max(1);
            c.next_id = id + 1;
            id
        })?;
        Ok(TrackId::from_seq(id))
    }

    /// Upsert the metadata record for `id`, stamping it with the current time.
    pub fn register(&self, id: &TrackId, title: &str) -> Result<(), StoreError> {
        let record = TrackRecord {
            title: clean_title(title),
            added_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.index.with_lock(|index| {
            index.insert(id.clone(), record);
        })?;
        info!("registered track {id}");
        Ok(())
    }

    pub fn record(&self, id: &TrackId) -> Result<Option<TrackRecord>, StoreError> {
        Ok(self.index.load()?.remove(id))
    }

    /// Display title for `id`, or `"Track <id>"` when nothing is known about it.
    pub fn lookup_title(&self, id: &TrackId) -> String {
        match self.record(id) {
            Ok(Some(record)) => record.title,
            Ok(None) => placeholder_title(id),
            Err(e) => {
                warn!("could not read metadata for track {id}: {e}");
                placeholder_title(id)
            }
        }
    }

    /// Remove the asset and its metadata record.
    ///
    /// Returns `false` when no asset existed; the metadata entry is left alone then.
    pub fn delete(&self, id: &TrackId) -> Result<bool, StoreError> {
        let path = self.asset_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StoreError::io(&path, e)),
        }
        self.index.with_lock(|index| {
            index.remove(id);
        })?;
        info!("deleted track {id}");
        Ok(true)
    }

    pub fn exists(&self, id: &TrackId) -> bool {
        self.asset_path(id).is_file()
    }

    /// Every asset currently on disk, joined with its metadata, in ID order.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let index = self.index.load()?;
        let mut entries: Vec<CatalogEntry> = scan_assets(&self.songs_dir, &self.extension)
            .into_iter()
            .map(|asset| CatalogEntry {
                record: index.get(&asset.id).cloned(),
                id: asset.id,
                path: asset.path,
                duration: asset.duration,
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }
}

impl TrackLookup for Catalog {
    fn exists(&self, id: &TrackId) -> bool {
        Catalog::exists(self, id)
    }
}

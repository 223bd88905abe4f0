use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::catalog::{TrackId, clean_title};
use crate::config::DownloadSettings;
use crate::library::Library;
use crate::playlist::PlaylistId;

use super::cancel::CancellationToken;
use super::error::DownloadError;
use super::resolver::{
    Candidate, CollectionSource, RemoteCollection, RemoteItem, TrackDescriptor, TrackResolver,
};
use super::select::SelectionPolicy;

/// Staging files are named `<prefix><remote id>.<ext>` so they never parse as a track ID.
const STAGING_PREFIX: &str = "incoming-";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Resolving,
    Fetching,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { id: TrackId, title: String },
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure {
    pub track: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed {
        playlist: PlaylistId,
        name: String,
        downloaded: Vec<TrackId>,
        failed: Vec<ItemFailure>,
    },
    /// Every track this batch had registered was removed again.
    Cancelled { rolled_back: Vec<TrackId> },
}

/// Per-item progress of a batch download. Positions count from 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchProgress {
    Started {
        position: usize,
        total: usize,
        track: String,
    },
    Downloaded {
        position: usize,
        total: usize,
        id: TrackId,
        title: String,
    },
    Skipped {
        position: usize,
        total: usize,
        track: String,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    Track(DownloadOutcome),
    Collection(BatchOutcome),
}

/// Resolve, fetch and register remote audio into the catalog.
///
/// One operation runs at a time; a second caller gets [`DownloadError::Busy`].
/// [`cancel`](Self::cancel) may be called from any thread while an operation runs.
pub struct DownloadPipeline<R> {
    resolver: R,
    library: Arc<Library>,
    policy: SelectionPolicy,
    query_suffix: String,
    token: CancellationToken,
    in_flight: AtomicBool,
    state: Mutex<DownloadState>,
}

/// Clears the in-flight flag when the operation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<R: TrackResolver> DownloadPipeline<R> {
    pub fn new(
        resolver: R,
        library: Arc<Library>,
        policy: SelectionPolicy,
        query_suffix: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            library,
            policy,
            query_suffix: query_suffix.into(),
            token: CancellationToken::new(),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(DownloadState::Idle),
        }
    }

    pub fn from_settings(resolver: R, library: Arc<Library>, settings: &DownloadSettings) -> Self {
        Self::new(
            resolver,
            library,
            SelectionPolicy::from_settings(settings),
            settings.query_suffix.clone(),
        )
    }

    pub fn state(&self) -> DownloadState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Ask the running operation to stop at its next checkpoint.
    ///
    /// Returns `false` when nothing is running.
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.token.request();
        info!("cancellation requested while {:?}", self.state());
        true
    }

    /// Download the audio behind a single URL.
    pub fn download_url(&self, url: &str) -> Result<DownloadOutcome, DownloadError> {
        let _guard = self.begin()?;
        let result = self.probe_and_fetch(url);
        self.settle(&result);
        result
    }

    /// Search by name (optionally narrowed by artist and album) and download the best match.
    pub fn download_by_name(
        &self,
        name: &str,
        artist: &str,
        album: &str,
    ) -> Result<DownloadOutcome, DownloadError> {
        let _guard = self.begin()?;
        let descriptor = TrackDescriptor::new(name, artist, album);
        // Free-text searches keep the title of what was actually found.
        let result = match self.resolve(&descriptor.query(&self.query_suffix)) {
            Ok(Some(candidate)) => {
                let title = candidate.title.clone();
                self.fetch_and_register(&candidate, &title)
            }
            Ok(None) => Ok(DownloadOutcome::Cancelled),
            Err(e) => Err(e),
        };
        self.settle(&result);
        result
    }

    /// Download a link understood by `source`: one track, or a whole collection
    /// which then becomes a playlist. `progress` hears about each collection item.
    pub fn download_remote(
        &self,
        source: &dyn CollectionSource,
        url: &str,
        progress: &mut dyn FnMut(BatchProgress),
    ) -> Result<RemoteOutcome, DownloadError> {
        let _guard = self.begin()?;
        self.transition(DownloadState::Resolving);
        let item = match source.resolve(url) {
            Ok(item) => item,
            Err(e) => {
                self.transition(DownloadState::Failed);
                return Err(e.into());
            }
        };

        match item {
            RemoteItem::Track(descriptor) => {
                let result = self.download_descriptor(&descriptor);
                self.settle(&result);
                result.map(RemoteOutcome::Track)
            }
            RemoteItem::Collection(collection) => {
                self.run_batch(&collection, progress)
                    .map(RemoteOutcome::Collection)
            }
        }
    }

    fn begin(&self) -> Result<InFlight<'_>, DownloadError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DownloadError::Busy);
        }
        self.token.reset();
        self.transition(DownloadState::Idle);
        Ok(InFlight(&self.in_flight))
    }

    fn transition(&self, next: DownloadState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            debug!("download state {:?} -> {next:?}", *state);
            *state = next;
        }
    }

    fn settle(&self, result: &Result<DownloadOutcome, DownloadError>) {
        self.transition(match result {
            Ok(DownloadOutcome::Completed { .. }) => DownloadState::Completed,
            Ok(DownloadOutcome::Cancelled) => DownloadState::Cancelled,
            Err(_) => DownloadState::Failed,
        });
    }

    fn probe_and_fetch(&self, url: &str) -> Result<DownloadOutcome, DownloadError> {
        self.transition(DownloadState::Resolving);
        if self.token.is_requested() {
            return Ok(DownloadOutcome::Cancelled);
        }
        let candidate = self.resolver.probe(url)?;
        let title = candidate.title.clone();
        self.fetch_and_register(&candidate, &title)
    }

    fn download_descriptor(
        &self,
        descriptor: &TrackDescriptor,
    ) -> Result<DownloadOutcome, DownloadError> {
        match self.resolve(&descriptor.query(&self.query_suffix))? {
            Some(candidate) => self.fetch_and_register(&candidate, &descriptor.display_title()),
            None => Ok(DownloadOutcome::Cancelled),
        }
    }

    /// Search and apply the selection policy. `Ok(None)` means cancelled.
    fn resolve(&self, query: &str) -> Result<Option<Candidate>, DownloadError> {
        self.transition(DownloadState::Resolving);
        if self.token.is_requested() {
            return Ok(None);
        }
        debug!("searching for '{query}'");
        let candidates = self.resolver.search(query)?;
        if self.token.is_requested() {
            return Ok(None);
        }
        self.policy
            .select(&candidates)
            .cloned()
            .map(Some)
            .ok_or_else(|| DownloadError::NoSuitableMatch(query.to_string()))
    }

    fn fetch_and_register(
        &self,
        candidate: &Candidate,
        title: &str,
    ) -> Result<DownloadOutcome, DownloadError> {
        if self.token.is_requested() {
            return Ok(DownloadOutcome::Cancelled);
        }
        self.transition(DownloadState::Fetching);

        let catalog = &self.library.catalog;
        let stem = format!("{STAGING_PREFIX}{}", staging_name(&candidate.remote_id));
        let staging = catalog
            .songs_dir()
            .join(format!("{stem}.{}", catalog.extension()));
        info!("fetching {} ({})", candidate.title, candidate.url);

        let fetched = match self.resolver.fetch(candidate, &staging) {
            Ok(path) => path,
            Err(e) => {
                discard_staged(catalog.songs_dir(), &stem);
                return Err(e.into());
            }
        };
        if self.token.is_requested() {
            discard(&fetched);
            discard_staged(catalog.songs_dir(), &stem);
            info!("download of {} cancelled; partial file removed", candidate.title);
            return Ok(DownloadOutcome::Cancelled);
        }

        let id = match catalog.allocate_id() {
            Ok(id) => id,
            Err(e) => {
                discard(&fetched);
                return Err(e.into());
            }
        };
        let target = catalog.asset_path(&id);
        if let Err(source) = fs::rename(&fetched, &target) {
            discard(&fetched);
            return Err(DownloadError::Io {
                path: target,
                source,
            });
        }
        if let Err(e) = catalog.register(&id, title) {
            discard(&target);
            return Err(e.into());
        }

        let title = clean_title(title);
        info!("downloaded track {id}: {title}");
        Ok(DownloadOutcome::Completed { id, title })
    }

    fn run_batch(
        &self,
        collection: &RemoteCollection,
        progress: &mut dyn FnMut(BatchProgress),
    ) -> Result<BatchOutcome, DownloadError> {
        let total = collection.tracks.len();
        let mut downloaded = Vec::new();
        let mut failed = Vec::new();

        for (n, track) in collection.tracks.iter().enumerate() {
            if self.token.is_requested() {
                return Ok(self.roll_back(downloaded));
            }
            let position = n + 1;
            info!("[{position}/{total}] {}", track.display_title());
            progress(BatchProgress::Started {
                position,
                total,
                track: track.display_title(),
            });

            match self.download_descriptor(track) {
                Ok(DownloadOutcome::Completed { id, title }) => {
                    progress(BatchProgress::Downloaded {
                        position,
                        total,
                        id: id.clone(),
                        title,
                    });
                    downloaded.push(id);
                }
                Ok(DownloadOutcome::Cancelled) => return Ok(self.roll_back(downloaded)),
                Err(e) if e.is_item_failure() => {
                    warn!("skipping {}: {e}", track.display_title());
                    progress(BatchProgress::Skipped {
                        position,
                        total,
                        track: track.display_title(),
                        reason: e.to_string(),
                    });
                    failed.push(ItemFailure {
                        track: track.display_title(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    self.transition(DownloadState::Failed);
                    return Err(e);
                }
            }
        }

        if downloaded.is_empty() {
            self.transition(DownloadState::Failed);
            return Err(DownloadError::NothingDownloaded(collection.name.clone()));
        }

        let playlist = match self
            .library
            .playlists
            .create(&collection.name, downloaded.clone())
        {
            Ok(id) => id,
            Err(e) => {
                self.transition(DownloadState::Failed);
                return Err(e.into());
            }
        };
        self.transition(DownloadState::Completed);
        info!(
            "collection '{}' saved as playlist {playlist} ({} of {total} tracks)",
            collection.name,
            downloaded.len()
        );
        Ok(BatchOutcome::Completed {
            playlist,
            name: collection.name.clone(),
            downloaded,
            failed,
        })
    }

    fn roll_back(&self, downloaded: Vec<TrackId>) -> BatchOutcome {
        for id in &downloaded {
            if let Err(e) = self.library.catalog.delete(id) {
                warn!("could not roll back track {id}: {e}");
            }
        }
        self.transition(DownloadState::Cancelled);
        info!("batch cancelled; rolled back {} track(s)", downloaded.len());
        BatchOutcome::Cancelled {
            rolled_back: downloaded,
        }
    }
}

fn staging_name(remote_id: &str) -> String {
    remote_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Remove whatever a failed or cancelled fetch left under `stem`, such as
/// `<stem>.webm.part` or an unconverted `<stem>.webm`.
fn discard_staged(dir: &Path, stem: &str) {
    let prefix = format!("{stem}.");
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("could not list {}: {e}", dir.display());
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix))
        {
            discard(&entry.path());
        }
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}

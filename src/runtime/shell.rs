use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, warn};

use crate::catalog::TrackId;
use crate::config::{Settings, resolve_config_path};
use crate::download::{
    BatchOutcome, BatchProgress, CollectionSource, DownloadError, DownloadOutcome,
    DownloadPipeline, RemoteOutcome, TrackResolver, is_spotify_link,
};
use crate::error::LibraryError;
use crate::library::Library;
use crate::playback::{AudioSink, PlaybackError, Scheduler};
use crate::playlist::{CheckReport, EditAction, PlaylistId};

use super::commands::{Command, DeleteTarget, HELP};
use super::console::Console;
use super::display::{playlist_line, progress_line, song_line};
use super::input::{Inbox, Input};

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The interactive command loop.
///
/// Downloads run on one worker thread so `cancel` can be typed meanwhile;
/// everything else runs on the caller's thread.
pub struct Shell<R: TrackResolver + 'static, S: AudioSink> {
    settings: Settings,
    library: Arc<Library>,
    scheduler: Scheduler<S>,
    pipeline: Arc<DownloadPipeline<R>>,
    spotify: Arc<dyn CollectionSource>,
    console: Console,
    worker: Option<JoinHandle<()>>,
}

impl<R: TrackResolver + 'static, S: AudioSink> Shell<R, S> {
    pub fn new(
        settings: Settings,
        library: Arc<Library>,
        scheduler: Scheduler<S>,
        pipeline: Arc<DownloadPipeline<R>>,
        spotify: Arc<dyn CollectionSource>,
        console: Console,
    ) -> Self {
        Self {
            settings,
            library,
            scheduler,
            pipeline,
            spotify,
            console,
            worker: None,
        }
    }

    /// Read commands until `exit`, end of input or an interrupt, then stop everything.
    pub fn run(&mut self, inbox: &Inbox) {
        self.console
            .line("tuneshelf: local music catalog. Type 'help' for commands.");
        loop {
            self.console.prompt("> ");
            let line = match inbox.next() {
                Input::Line(line) => line,
                Input::Closed => {
                    self.console.line("");
                    break;
                }
                Input::Interrupted => {
                    self.console.line("\ninterrupted");
                    break;
                }
            };
            match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(cmd)) => {
                    if self.execute(cmd, inbox) == Flow::Exit {
                        break;
                    }
                }
                Err(e) => self.console.line(e),
            }
        }
        self.shutdown();
    }

    pub fn execute(&mut self, cmd: Command, inbox: &Inbox) -> Flow {
        match cmd {
            Command::Download(url) => {
                if is_spotify_link(&url) {
                    self.spawn_remote_download(url);
                } else {
                    self.spawn_download(move |pipeline, console| {
                        report_track(console, pipeline.download_url(&url));
                    });
                }
            }
            Command::DownloadSpotify(url) => self.spawn_remote_download(url),
            Command::Search {
                name,
                artist,
                album,
            } => {
                self.console.line(format!(
                    "searching: {}",
                    [name.as_str(), artist.as_str(), album.as_str()]
                        .into_iter()
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                ));
                self.spawn_download(move |pipeline, console| {
                    report_track(console, pipeline.download_by_name(&name, &artist, &album));
                });
            }
            Command::Cancel => {
                if self.pipeline.cancel() {
                    self.console.line("cancelling download...");
                } else {
                    self.console.line("no download in progress");
                }
            }
            Command::Create { name, tracks } => self.create(&name, tracks),
            Command::Edit {
                playlist,
                action,
                tracks,
            } => self.edit(&playlist, action, &tracks),
            Command::Delete { target, password } => self.delete(target, password.as_deref()),
            Command::Check(id) => return self.check(&id, inbox),
            Command::Lists => self.show_lists(),
            Command::Songs => self.show_songs(),
            Command::ShowList(id) => self.show_list(&id),
            Command::Play(id) => match self.scheduler.play_playlist(&id) {
                Ok(now) => self.console.line(format!("playing {id}: {}", now.title)),
                Err(e) => self.playback_failed(e),
            },
            Command::PlaySong(id) => match self.scheduler.play_song(&id) {
                Ok(now) => self.console.line(format!("playing: {}", now.title)),
                Err(e) => self.playback_failed(e),
            },
            Command::Next => match self.scheduler.next() {
                Ok(Some(now)) => self.console.line(format!("playing: {}", now.title)),
                Ok(None) => self.console.line("playback finished"),
                Err(e) => self.playback_failed(e),
            },
            Command::Stop => {
                if self.scheduler.stop() {
                    self.console.line("playback stopped");
                } else {
                    self.console.line("nothing is playing");
                }
            }
            Command::Volume(level) => match self.scheduler.set_volume(level) {
                Ok(()) => self.console.line(format!("volume set to {level}%")),
                Err(e) => self.playback_failed(e),
            },
            Command::Config => self.show_config(),
            Command::Help => self.console.line(HELP),
            Command::Exit => return Flow::Exit,
        }
        Flow::Continue
    }

    /// Block until the current download (if any) has finished.
    pub fn wait_for_download(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("download worker panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        if self.pipeline.cancel() {
            self.console.line("cancelling download...");
        }
        self.wait_for_download();
        if self.scheduler.stop() {
            self.console.line("playback stopped");
        }
    }

    fn spawn_download<F>(&mut self, job: F)
    where
        F: FnOnce(&DownloadPipeline<R>, &Console) + Send + 'static,
    {
        if self.pipeline.is_running() {
            self.console
                .line("a download is already running; use 'cancel' to stop it");
            return;
        }
        self.wait_for_download();
        let pipeline = Arc::clone(&self.pipeline);
        let console = self.console.clone();
        self.worker = Some(thread::spawn(move || job(&pipeline, &console)));
    }

    fn spawn_remote_download(&mut self, url: String) {
        let source = Arc::clone(&self.spotify);
        self.spawn_download(move |pipeline, console| {
            let mut progress = |event: BatchProgress| console.line(progress_line(&event));
            match pipeline.download_remote(source.as_ref(), &url, &mut progress) {
                Ok(RemoteOutcome::Track(outcome)) => report_track(console, Ok(outcome)),
                Ok(RemoteOutcome::Collection(outcome)) => report_batch(console, Ok(outcome)),
                Err(e) => report_batch(console, Err(e)),
            }
        });
    }

    fn create(&self, name: &str, tracks: Vec<TrackId>) {
        let (valid, skipped): (Vec<TrackId>, Vec<TrackId>) = tracks
            .into_iter()
            .partition(|id| self.library.catalog.exists(id));
        for id in &skipped {
            warn!("track {id} does not exist; skipped");
            self.console.line(format!("track {id} does not exist; skipped"));
        }
        match self.library.playlists.create(name, valid) {
            Ok(id) => self.console.line(format!("created playlist {id}")),
            Err(e) => self.library_failed(e.into()),
        }
    }

    fn edit(&self, id: &PlaylistId, action: EditAction, tracks: &[TrackId]) {
        match self.library.edit_playlist(id, action, tracks) {
            Ok(report) => {
                for skipped in &report.skipped {
                    self.console
                        .line(format!("track {skipped} does not exist; skipped"));
                }
                let verb = match action {
                    EditAction::Add => "added",
                    EditAction::Remove => "removed",
                };
                self.console.line(format!(
                    "{verb} {} track(s); {id} now has {}",
                    report.applied.len(),
                    report.len
                ));
            }
            Err(e) => self.library_failed(e),
        }
    }

    fn delete(&self, target: DeleteTarget, password: Option<&str>) {
        if let Some(expected) = self.settings.library.delete_password.as_deref() {
            if password != Some(expected) {
                self.console.line("wrong password");
                return;
            }
        }
        match target {
            DeleteTarget::Playlist(id) => match self.library.playlists.delete(&id) {
                Ok(()) => self.console.line(format!("deleted playlist {id}")),
                Err(e) => self.library_failed(e),
            },
            DeleteTarget::Track(id) => match self.library.delete_track(&id) {
                Ok(touched) => {
                    self.console.line(format!("deleted track {id}"));
                    if !touched.is_empty() {
                        let lists: Vec<String> = touched.iter().map(ToString::to_string).collect();
                        self.console
                            .line(format!("removed from {}", lists.join(", ")));
                    }
                }
                Err(e) => self.library_failed(e),
            },
        }
    }

    /// Report missing tracks and prune them if the user agrees. An interrupt
    /// at the prompt declines and ends the shell.
    fn check(&self, id: &PlaylistId, inbox: &Inbox) -> Flow {
        let catalog = &self.library.catalog;
        let console = &self.console;
        let mut flow = Flow::Continue;
        let confirm = |report: &CheckReport| {
            console.line(format!(
                "{} of {} track(s) in {} are missing:",
                report.missing.len(),
                report.present.len() + report.missing.len(),
                report.name
            ));
            for missing in &report.missing {
                console.line(format!(
                    "  {} (ID: {missing})",
                    catalog.lookup_title(missing)
                ));
            }
            console.prompt("remove them from the playlist? [y/N] ");
            match inbox.next() {
                Input::Line(answer) => {
                    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
                }
                Input::Interrupted | Input::Closed => {
                    console.line("");
                    flow = Flow::Exit;
                    false
                }
            }
        };

        match self.library.reconcile_playlist(id, confirm) {
            Ok(outcome) if outcome.report.is_intact() => self.console.line(format!(
                "all {} track(s) in {} are present",
                outcome.report.present.len(),
                outcome.report.name
            )),
            Ok(outcome) => match outcome.pruned {
                Some(n) => self.console.line(format!(
                    "removed {n} track(s); {} remain",
                    outcome.report.present.len()
                )),
                None => self.console.line("playlist left unchanged"),
            },
            Err(e) => self.library_failed(e),
        }
        flow
    }

    fn show_lists(&self) {
        match self.library.playlists.list() {
            Ok(lists) if lists.is_empty() => self.console.line("no playlists yet"),
            Ok(lists) => {
                for (n, summary) in lists.iter().enumerate() {
                    self.console.line(playlist_line(n + 1, summary));
                }
            }
            Err(e) => self.library_failed(e),
        }
    }

    fn show_songs(&self) {
        match self.library.catalog.entries() {
            Ok(entries) if entries.is_empty() => self.console.line("no tracks downloaded yet"),
            Ok(entries) => {
                for (n, entry) in entries.iter().enumerate() {
                    self.console.line(song_line(n + 1, entry));
                }
            }
            Err(e) => self.library_failed(e.into()),
        }
    }

    fn show_list(&self, id: &PlaylistId) {
        let playlist = match self.library.playlists.get(id) {
            Ok(p) => p,
            Err(e) => return self.library_failed(e),
        };
        self.console.line(format!(
            "{id}: {} ({} track(s))",
            playlist.name,
            playlist.songs.len()
        ));
        let catalog = &self.library.catalog;
        for (n, track) in playlist.songs.iter().enumerate() {
            let mut line = format!("{}. {} (ID: {track})", n + 1, catalog.lookup_title(track));
            if !catalog.exists(track) {
                line.push_str(" [missing]");
            }
            self.console.line(line);
        }
    }

    fn show_config(&self) {
        let mut shown = self.settings.clone();
        if shown.library.delete_password.is_some() {
            shown.library.delete_password = Some("********".to_string());
        }
        if shown.spotify.client_secret.is_some() {
            shown.spotify.client_secret = Some("********".to_string());
        }
        match resolve_config_path() {
            Some(path) => self.console.line(format!("# config file: {}", path.display())),
            None => self.console.line("# no config file location"),
        }
        self.console
            .line(format!("# data directory: {}", self.settings.data_dir().display()));
        match toml::to_string_pretty(&shown) {
            Ok(text) => self.console.line(text.trim_end()),
            Err(e) => self.console.line(format!("cannot render settings: {e}")),
        }
    }

    fn library_failed(&self, e: LibraryError) {
        if e.is_storage() {
            error!("{e}");
            self.console.line(format!("storage error: {e}"));
        } else {
            self.console.line(e);
        }
    }

    fn playback_failed(&self, e: PlaybackError) {
        match e {
            PlaybackError::Library(e) => self.library_failed(e),
            PlaybackError::Load { .. } => {
                self.console.line(e);
                self.console
                    .line("playback stopped; 'check' the playlist for missing tracks");
            }
            other => self.console.line(other),
        }
    }
}

fn report_track(console: &Console, result: Result<DownloadOutcome, DownloadError>) {
    match result {
        Ok(DownloadOutcome::Completed { id, title }) => {
            console.line(format!("downloaded track {id}: {title}"));
        }
        Ok(DownloadOutcome::Cancelled) => console.line("download cancelled"),
        Err(e) => report_failure(console, e),
    }
}

fn report_batch(console: &Console, result: Result<BatchOutcome, DownloadError>) {
    match result {
        Ok(BatchOutcome::Completed {
            playlist,
            name,
            downloaded,
            failed,
        }) => {
            let mut summary = format!(
                "created playlist {playlist} ({name}) with {} track(s)",
                downloaded.len()
            );
            if !failed.is_empty() {
                summary.push_str(&format!("; {} skipped", failed.len()));
            }
            console.line(summary);
        }
        Ok(BatchOutcome::Cancelled { rolled_back }) => console.line(format!(
            "download cancelled; removed {} track(s) fetched so far",
            rolled_back.len()
        )),
        Err(e) => report_failure(console, e),
    }
}

fn report_failure(console: &Console, e: DownloadError) {
    if e.is_item_failure() || matches!(e, DownloadError::Busy) {
        console.line(format!("download failed: {e}"));
    } else {
        error!("download failed: {e}");
        console.line(format!("download failed: {e}"));
    }
}

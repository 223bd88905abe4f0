use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::{TempDir, tempdir};

use super::*;
use crate::catalog::TrackId;
use crate::config::PlaybackSettings;
use crate::library::Library;
use crate::playlist::PlaylistId;

#[derive(Default)]
struct SinkState {
    pending: Option<PathBuf>,
    /// Paths that actually started playing.
    loaded: Vec<PathBuf>,
    busy: bool,
    volume: f32,
    stops: usize,
}

/// Sink that only records what it was told. Tracks end when the test says so.
#[derive(Default)]
struct FakeSink(Mutex<SinkState>);

impl FakeSink {
    fn state(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.0.lock().unwrap()
    }

    fn finish_track(&self) {
        self.state().busy = false;
    }

    fn loads(&self) -> usize {
        self.state().loaded.len()
    }
}

impl AudioSink for FakeSink {
    fn load(&self, path: &Path) -> Result<(), SinkError> {
        if !path.is_file() {
            return Err(SinkError::Open {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        let mut state = self.state();
        state.pending = Some(path.to_path_buf());
        state.busy = false;
        Ok(())
    }

    fn play(&self) {
        let mut state = self.state();
        if let Some(path) = state.pending.take() {
            state.loaded.push(path);
        }
        state.busy = true;
    }

    fn stop(&self) {
        let mut state = self.state();
        state.busy = false;
        state.stops += 1;
    }

    fn is_busy(&self) -> bool {
        self.state().busy
    }

    fn set_volume(&self, level: f32) {
        self.state().volume = level;
    }
}

struct Fixture {
    scheduler: Scheduler<FakeSink>,
    sink: Arc<FakeSink>,
    library: Arc<Library>,
    _dir: TempDir,
}

/// A library holding `tracks` assets (IDs 1..=n), a playlist with all of them,
/// and a scheduler polling every 5 ms.
fn fixture(tracks: usize) -> (Fixture, PlaylistId) {
    let dir = tempdir().unwrap();
    let library = Arc::new(
        Library::open(&dir.path().join("Songs"), &dir.path().join("Lists"), "mp3").unwrap(),
    );
    let mut ids = Vec::new();
    for n in 0..tracks {
        let id = library.catalog.allocate_id().unwrap();
        fs::write(library.catalog.asset_path(&id), b"audio").unwrap();
        library.catalog.register(&id, &format!("Song {n}.mp3")).unwrap();
        ids.push(id);
    }
    let playlist = library.playlists.create("Everything", ids).unwrap();

    let sink = Arc::new(FakeSink::default());
    let settings = PlaybackSettings {
        poll_interval_ms: 5,
        ..PlaybackSettings::default()
    };
    let scheduler = Scheduler::with_rng(
        Arc::clone(&sink),
        Arc::clone(&library),
        &settings,
        StdRng::seed_from_u64(11),
    );
    (
        Fixture {
            scheduler,
            sink,
            library,
            _dir: dir,
        },
        playlist,
    )
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn initial_volume_comes_from_settings() {
    let (f, _) = fixture(0);
    assert!(close(f.sink.state().volume, 0.30));
}

#[test]
fn volume_above_ceiling_is_rejected_without_change() {
    let (f, _) = fixture(0);

    let err = f.scheduler.set_volume(60).unwrap_err();
    assert!(matches!(err, PlaybackError::VolumeOutOfRange { requested: 60, max: 50 }));
    assert!(close(f.sink.state().volume, 0.30));

    f.scheduler.set_volume(45).unwrap();
    assert!(close(f.sink.state().volume, 0.45));
    f.scheduler.set_volume(0).unwrap();
    assert!(close(f.sink.state().volume, 0.0));
}

#[test]
fn playlist_session_advances_when_track_ends() {
    let (f, playlist) = fixture(3);

    let first = f.scheduler.play_playlist(&playlist).unwrap();
    assert!(first.title.starts_with("Song "));
    assert!(!first.title.ends_with(".mp3"));
    assert!(f.scheduler.is_playing());
    assert_eq!(f.sink.loads(), 1);

    f.sink.finish_track();
    wait_until("second track", || f.sink.loads() == 2);
    f.sink.finish_track();
    wait_until("third track", || f.sink.loads() == 3);

    let played: std::collections::HashSet<PathBuf> = f.sink.state().loaded.iter().cloned().collect();
    assert_eq!(played.len(), 3, "first cycle must not repeat");

    assert!(f.scheduler.stop());
    assert!(!f.scheduler.is_playing());
    assert!(!f.sink.is_busy());
    assert_eq!(f.scheduler.now_playing(), None);
}

#[test]
fn stop_joins_monitor_so_no_further_advance_happens() {
    let (f, playlist) = fixture(2);
    f.scheduler.play_playlist(&playlist).unwrap();
    f.scheduler.stop();

    f.sink.finish_track();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(f.sink.loads(), 1);
    assert!(!f.scheduler.stop());
}

#[test]
fn missing_asset_stops_the_session() {
    let (f, playlist) = fixture(2);
    let now = f.scheduler.play_playlist(&playlist).unwrap();

    // Remove the track that has not played yet.
    let other: TrackId = if now.id.as_str() == "1" { "2" } else { "1" }.parse().unwrap();
    fs::remove_file(f.library.catalog.asset_path(&other)).unwrap();

    f.sink.finish_track();
    wait_until("session to stop", || !f.scheduler.is_playing());
    assert_eq!(f.sink.loads(), 1);
}

#[test]
fn play_song_ends_with_its_track() {
    let (f, _) = fixture(2);
    let id: TrackId = "2".parse().unwrap();

    let now = f.scheduler.play_song(&id).unwrap();
    assert_eq!(now.id, id);
    assert_eq!(now.title, "Song 1");
    assert!(f.scheduler.is_playing());

    f.sink.finish_track();
    wait_until("session to end", || !f.scheduler.is_playing());
    assert_eq!(f.sink.loads(), 1);
}

#[test]
fn play_song_with_missing_asset_fails() {
    let (f, _) = fixture(1);
    let err = f.scheduler.play_song(&"9".parse().unwrap()).unwrap_err();
    assert!(matches!(err, PlaybackError::Load { .. }));
    assert!(!f.scheduler.is_playing());
}

#[test]
fn next_skips_within_session_and_reports_idle() {
    let (f, playlist) = fixture(3);
    assert!(matches!(f.scheduler.next(), Err(PlaybackError::NothingPlaying)));

    let first = f.scheduler.play_playlist(&playlist).unwrap();
    let second = f.scheduler.next().unwrap().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(f.scheduler.now_playing(), Some(second));
    assert_eq!(f.sink.loads(), 2);
}

#[test]
fn next_on_single_track_session_ends_it() {
    let (f, _) = fixture(1);
    f.scheduler.play_song(&"1".parse().unwrap()).unwrap();
    assert_eq!(f.scheduler.next().unwrap(), None);
    wait_until("session to end", || !f.scheduler.is_playing());
    assert!(matches!(f.scheduler.next(), Err(PlaybackError::NothingPlaying)));
}

#[test]
fn new_session_replaces_the_old_one() {
    let (f, playlist) = fixture(2);
    f.scheduler.play_playlist(&playlist).unwrap();
    let stops_before = f.sink.state().stops;

    let now = f.scheduler.play_song(&"1".parse().unwrap()).unwrap();
    assert!(f.sink.state().stops > stops_before);
    assert_eq!(f.scheduler.now_playing(), Some(now));
}

#[test]
fn empty_or_unknown_playlist_does_not_start() {
    let (f, _) = fixture(0);
    let empty = f.library.playlists.create("Nothing", Vec::new()).unwrap();
    assert!(matches!(
        f.scheduler.play_playlist(&empty),
        Err(PlaybackError::EmptyPlaylist(_))
    ));
    assert!(matches!(
        f.scheduler.play_playlist(&"42L".parse().unwrap()),
        Err(PlaybackError::Library(_))
    ));
    assert!(!f.scheduler.is_playing());
}

#[test]
fn configured_ceiling_cannot_exceed_the_hard_limit() {
    let dir = tempdir().unwrap();
    let library = Arc::new(
        Library::open(&dir.path().join("Songs"), &dir.path().join("Lists"), "mp3").unwrap(),
    );
    let sink = Arc::new(FakeSink::default());
    let settings = PlaybackSettings {
        default_volume: 80,
        max_volume: 100,
        ..PlaybackSettings::default()
    };
    let scheduler = Scheduler::new(Arc::clone(&sink), library, &settings);
    assert!(close(sink.state().volume, 0.5));

    assert!(matches!(
        scheduler.set_volume(60),
        Err(PlaybackError::VolumeOutOfRange {
            requested: 60,
            max: 50
        })
    ));
    assert!(close(sink.state().volume, 0.5));

    scheduler.set_volume(50).unwrap();
    assert!(close(sink.state().volume, 0.5));
}

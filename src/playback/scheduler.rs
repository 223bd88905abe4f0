use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::TrackId;
use crate::config::{PlaybackSettings, VOLUME_CEILING};
use crate::library::Library;
use crate::playlist::PlaylistId;

use super::error::PlaybackError;
use super::session::PlaybackSession;
use super::sink::AudioSink;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlaying {
    pub id: TrackId,
    pub title: String,
}

enum MonitorCmd {
    /// Skip to another track and report what plays now (`None`: session over).
    Next(Sender<Result<Option<NowPlaying>, PlaybackError>>),
    Stop,
}

struct Monitor {
    tx: Sender<MonitorCmd>,
    handle: JoinHandle<()>,
}

/// What the scheduler and its monitor thread share.
struct Engine<S> {
    sink: Arc<S>,
    library: Arc<Library>,
    rng: Arc<Mutex<StdRng>>,
    now: Arc<Mutex<Option<NowPlaying>>>,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            library: Arc::clone(&self.library),
            rng: Arc::clone(&self.rng),
            now: Arc::clone(&self.now),
        }
    }
}

impl<S: AudioSink> Engine<S> {
    fn set_now(&self, value: Option<NowPlaying>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    fn now(&self) -> Option<NowPlaying> {
        self.now.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Pick the next track of `session` and start it. `Ok(None)` means the
    /// session has nothing left to play.
    fn play_next_song(
        &self,
        session: &mut PlaybackSession,
    ) -> Result<Option<NowPlaying>, PlaybackError> {
        let next = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            session.pick_next(&mut *rng)
        };
        match next {
            Some(id) => self.start(&id).map(Some),
            None => Ok(None),
        }
    }

    fn start(&self, id: &TrackId) -> Result<NowPlaying, PlaybackError> {
        let path = self.library.catalog.asset_path(id);
        if let Err(source) = self.sink.load(&path) {
            self.set_now(None);
            return Err(PlaybackError::Load {
                id: id.clone(),
                source,
            });
        }
        self.sink.play();

        let now = NowPlaying {
            id: id.clone(),
            title: self.library.catalog.lookup_title(id),
        };
        info!("now playing {} ({})", now.title, now.id);
        self.set_now(Some(now.clone()));
        Ok(now)
    }
}

/// Plays playlists and single tracks through an [`AudioSink`].
///
/// At most one session is active. Each session has a monitor thread which
/// polls the sink and moves on when a track ends; starting a new session or
/// calling [`stop`](Self::stop) joins the old monitor first.
pub struct Scheduler<S: AudioSink> {
    engine: Engine<S>,
    max_volume: u8,
    poll_interval: Duration,
    active: Mutex<Option<Monitor>>,
}

impl<S: AudioSink> Scheduler<S> {
    pub fn new(sink: Arc<S>, library: Arc<Library>, settings: &PlaybackSettings) -> Self {
        Self::with_rng(sink, library, settings, StdRng::from_os_rng())
    }

    pub fn with_rng(
        sink: Arc<S>,
        library: Arc<Library>,
        settings: &PlaybackSettings,
        rng: StdRng,
    ) -> Self {
        let max_volume = settings.max_volume.min(VOLUME_CEILING);
        let initial = settings.default_volume.min(max_volume);
        sink.set_volume(f32::from(initial) / 100.0);
        Self {
            engine: Engine {
                sink,
                library,
                rng: Arc::new(Mutex::new(rng)),
                now: Arc::new(Mutex::new(None)),
            },
            max_volume,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            active: Mutex::new(None),
        }
    }

    /// Shuffle through `id` until stopped.
    pub fn play_playlist(&self, id: &PlaylistId) -> Result<NowPlaying, PlaybackError> {
        let playlist = self.engine.library.playlists.get(id)?;
        let mut active = self.active();
        self.shutdown(&mut active);

        let total = playlist.songs.len();
        let mut session = PlaybackSession::new(playlist.songs);
        let now = self
            .engine
            .play_next_song(&mut session)?
            .ok_or_else(|| PlaybackError::EmptyPlaylist(id.clone()))?;
        info!("playing playlist {id} ({}, {total} tracks)", playlist.name);
        *active = Some(self.spawn_monitor(session));
        Ok(now)
    }

    /// Play one track; the session ends when it does.
    pub fn play_song(&self, id: &TrackId) -> Result<NowPlaying, PlaybackError> {
        let mut active = self.active();
        self.shutdown(&mut active);

        let now = self.engine.start(id)?;
        *active = Some(self.spawn_monitor(PlaybackSession::single()));
        Ok(now)
    }

    /// Skip the current track. `Ok(None)` when the session had nothing left.
    pub fn next(&self) -> Result<Option<NowPlaying>, PlaybackError> {
        let active = self.active();
        let monitor = active.as_ref().ok_or(PlaybackError::NothingPlaying)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        monitor
            .tx
            .send(MonitorCmd::Next(reply_tx))
            .map_err(|_| PlaybackError::NothingPlaying)?;
        reply_rx.recv().map_err(|_| PlaybackError::NothingPlaying)?
    }

    /// End the active session and wait for its monitor. Returns whether
    /// anything was playing.
    pub fn stop(&self) -> bool {
        let mut active = self.active();
        let was_playing = self.is_playing();
        self.shutdown(&mut active);
        was_playing
    }

    /// Set the output volume in percent of the device maximum.
    pub fn set_volume(&self, level: u32) -> Result<(), PlaybackError> {
        if level > u32::from(self.max_volume) {
            return Err(PlaybackError::VolumeOutOfRange {
                requested: level,
                max: self.max_volume,
            });
        }
        self.engine.sink.set_volume(level as f32 / 100.0);
        debug!("volume set to {level}%");
        Ok(())
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.engine.now()
    }

    pub fn is_playing(&self) -> bool {
        self.now_playing().is_some()
    }

    fn active(&self) -> MutexGuard<'_, Option<Monitor>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn shutdown(&self, active: &mut Option<Monitor>) {
        if let Some(monitor) = active.take() {
            // The monitor may already be gone if its session ended on its own.
            let _ = monitor.tx.send(MonitorCmd::Stop);
            if monitor.handle.join().is_err() {
                warn!("playback monitor panicked");
            }
        }
        self.engine.sink.stop();
        self.engine.set_now(None);
    }

    fn spawn_monitor(&self, session: PlaybackSession) -> Monitor {
        let (tx, rx) = mpsc::channel();
        let engine = self.engine.clone();
        let poll_interval = self.poll_interval;
        let handle = thread::spawn(move || run_monitor(engine, session, rx, poll_interval));
        Monitor { tx, handle }
    }
}

impl<S: AudioSink> Drop for Scheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_monitor<S: AudioSink>(
    engine: Engine<S>,
    mut session: PlaybackSession,
    rx: Receiver<MonitorCmd>,
    poll_interval: Duration,
) {
    loop {
        match rx.recv_timeout(poll_interval) {
            Ok(MonitorCmd::Next(reply)) => {
                let result = engine.play_next_song(&mut session);
                let keep_going = matches!(result, Ok(Some(_)));
                let _ = reply.send(result);
                if !keep_going {
                    break;
                }
            }
            Ok(MonitorCmd::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if engine.sink.is_busy() {
                    continue;
                }
                match engine.play_next_song(&mut session) {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        debug!("session finished");
                        break;
                    }
                    Err(e) => {
                        error!("playback stopped: {e}");
                        break;
                    }
                }
            }
        }
    }
    engine.sink.stop();
    engine.set_now(None);
}

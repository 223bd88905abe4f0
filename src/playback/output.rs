//! `rodio` implementation of [`AudioSink`].
//!
//! The output stream stays on its own thread for the lifetime of the sink;
//! only the mixer handle crosses over.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use log::debug;
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink};

use super::sink::{AudioSink, SinkError};

pub struct RodioSink {
    mixer: Mixer,
    current: Mutex<Option<Sink>>,
    volume: Mutex<f32>,
    shutdown: Option<Sender<()>>,
    output: Option<JoinHandle<()>>,
}

impl RodioSink {
    /// Open the default output device.
    pub fn open() -> Result<Self, SinkError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<Mixer, String>>(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let output = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // rodio prints to stderr when the stream is dropped.
                stream.log_on_drop(false);
                if ready_tx.send(Ok(stream.mixer().clone())).is_err() {
                    return;
                }
                // Returns once the sink drops its sender.
                let _ = shutdown_rx.recv();
                debug!("audio output closed");
            })
            .map_err(|e| SinkError::Output(e.to_string()))?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| SinkError::Output("audio thread exited early".to_string()))?
            .map_err(SinkError::Output)?;

        Ok(Self {
            mixer,
            current: Mutex::new(None),
            volume: Mutex::new(1.0),
            shutdown: Some(shutdown_tx),
            output: Some(output),
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<Sink>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioSink for RodioSink {
    fn load(&self, path: &Path) -> Result<(), SinkError> {
        let file = File::open(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| SinkError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let sink = Sink::connect_new(&self.mixer);
        sink.set_volume(*self.volume.lock().unwrap_or_else(|e| e.into_inner()));
        sink.append(source);
        sink.pause();

        if let Some(old) = self.current().replace(sink) {
            old.stop();
        }
        Ok(())
    }

    fn play(&self) {
        if let Some(sink) = self.current().as_ref() {
            sink.play();
        }
    }

    fn stop(&self) {
        if let Some(sink) = self.current().take() {
            sink.stop();
        }
    }

    fn is_busy(&self) -> bool {
        self.current().as_ref().is_some_and(|sink| !sink.empty())
    }

    fn set_volume(&self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        *self.volume.lock().unwrap_or_else(|e| e.into_inner()) = level;
        if let Some(sink) = self.current().as_ref() {
            sink.set_volume(level);
        }
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        self.stop();
        drop(self.shutdown.take());
        if let Some(output) = self.output.take() {
            let _ = output.join();
        }
    }
}

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// Where decoded audio goes.
///
/// `load` replaces whatever was loaded before and leaves the new track
/// paused until `play`. `is_busy` turns false once the track has ended or
/// after `stop`.
pub trait AudioSink: Send + Sync + 'static {
    fn load(&self, path: &Path) -> Result<(), SinkError>;
    fn play(&self);
    fn stop(&self);
    fn is_busy(&self) -> bool;
    /// `level` is a fraction of the device maximum, `0.0..=1.0`.
    fn set_volume(&self, level: f32);
}

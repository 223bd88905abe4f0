//! Playback scheduling on top of an [`AudioSink`].

mod error;
mod output;
mod scheduler;
mod session;
mod sink;

pub use error::PlaybackError;
pub use output::RodioSink;
pub use scheduler::{NowPlaying, Scheduler};
pub use session::PlaybackSession;
pub use sink::{AudioSink, SinkError};

#[cfg(test)]
mod tests;

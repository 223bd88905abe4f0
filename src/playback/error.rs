use thiserror::Error;

use crate::catalog::TrackId;
use crate::error::LibraryError;
use crate::playlist::PlaylistId;

use super::sink::SinkError;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("cannot play track {id}: {source}")]
    Load {
        id: TrackId,
        #[source]
        source: SinkError,
    },

    #[error("volume {requested} is out of range (0-{max})")]
    VolumeOutOfRange { requested: u32, max: u8 },

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("playlist {0} is empty")]
    EmptyPlaylist(PlaylistId),
}

//! Turning remote links and search terms into catalog tracks.
//!
//! The [`DownloadPipeline`] drives a [`TrackResolver`] (search, probe, fetch)
//! and, for links to whole collections, a [`CollectionSource`]. It owns
//! cancellation, candidate selection and registration into the [`Library`].
//!
//! [`Library`]: crate::library::Library

mod cancel;
mod error;
mod pipeline;
mod resolver;
mod select;
mod spotify;
mod ytdlp;

pub use cancel::CancellationToken;
pub use error::DownloadError;
pub use pipeline::{
    BatchOutcome, BatchProgress, DownloadOutcome, DownloadPipeline, DownloadState, ItemFailure,
    RemoteOutcome,
};
pub use resolver::{
    Candidate, CollectionSource, RemoteCollection, RemoteItem, ResolveError, TrackDescriptor,
    TrackResolver,
};
pub use select::SelectionPolicy;
pub use spotify::{SpotifySource, is_spotify_link};
pub use ytdlp::YtDlpResolver;

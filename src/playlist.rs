//! Playlist store: named, ordered lists of track IDs kept as `Lists/<n>L.json`.

mod model;
mod store;

pub use model::*;
pub use store::PlaylistStore;

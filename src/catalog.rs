//! Catalog store: stable track IDs, the metadata index and the audio assets.
//!
//! Every downloaded track gets a decimal ID from a persisted counter that only
//! moves forward, so an ID is never handed out twice even after deletion.
//! The asset lives at `<songs_dir>/<id>.<ext>` and its title in `metadata.json`.

mod model;
mod scan;
mod store;

pub use model::*;
pub use store::{Catalog, TrackLookup};

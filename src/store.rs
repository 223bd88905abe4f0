//! Whole-document JSON persistence.
//!
//! Every persisted entity (metadata index, ID counters, playlists) is a single
//! JSON document rewritten in full on each change. `JsonDocument` serialises
//! those read-modify-write cycles behind one mutex per document.

mod document;

pub use document::JsonDocument;

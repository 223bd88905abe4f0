use std::time::Duration;

use crate::catalog::CatalogEntry;
use crate::download::BatchProgress;
use crate::playlist::PlaylistSummary;

/// `m:ss`, or `h:mm:ss` for anything an hour or longer.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// One line of the `songs` listing.
pub fn song_line(n: usize, entry: &CatalogEntry) -> String {
    let mut parts = vec![format!("{n}. {} (ID: {})", entry.title(), entry.id)];
    if let Some(d) = entry.duration {
        parts.push(format!("[{}]", format_duration(d)));
    }
    if let Some(record) = &entry.record {
        parts.push(format!("added {}", record.added_date));
    }
    parts.join(" ")
}

pub fn playlist_line(n: usize, summary: &PlaylistSummary) -> String {
    let noun = if summary.len == 1 { "track" } else { "tracks" };
    format!("{n}. {}: {} ({} {noun})", summary.id, summary.name, summary.len)
}

/// `[i/total] ...` line for one step of a collection download.
pub fn progress_line(event: &BatchProgress) -> String {
    match event {
        BatchProgress::Started {
            position,
            total,
            track,
        } => format!("[{position}/{total}] downloading: {track}"),
        BatchProgress::Downloaded {
            position,
            total,
            id,
            title,
        } => format!("[{position}/{total}] downloaded track {id}: {title}"),
        BatchProgress::Skipped {
            position,
            total,
            track,
            reason,
        } => format!("[{position}/{total}] skipped {track}: {reason}"),
    }
}

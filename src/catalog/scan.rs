use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::AudioFile;
use walkdir::WalkDir;

use super::model::TrackId;

pub(super) struct Asset {
    pub id: TrackId,
    pub path: PathBuf,
    pub duration: Option<Duration>,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Assets directly inside `dir` named `<id>.<extension>`.
///
/// Files whose stem is not a track ID (temporary downloads, stray files) are ignored.
pub(super) fn scan_assets(dir: &Path, extension: &str) -> Vec<Asset> {
    let mut assets = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !has_extension(path, extension) {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<TrackId>().ok().filter(|id| id.as_str() == s))
        else {
            continue;
        };

        // Unreadable or untagged files simply show no duration.
        let duration = lofty::read_from_path(path)
            .ok()
            .map(|tagged| tagged.properties().duration())
            .filter(|d| !d.is_zero());

        assets.push(Asset {
            id,
            path: path.to_path_buf(),
            duration,
        });
    }

    assets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn has_extension_is_case_insensitive() {
        assert!(has_extension(Path::new("/tmp/1.mp3"), "mp3"));
        assert!(has_extension(Path::new("/tmp/1.MP3"), "mp3"));
        assert!(!has_extension(Path::new("/tmp/1.webm"), "mp3"));
        assert!(!has_extension(Path::new("/tmp/1"), "mp3"));
    }

    #[test]
    fn scan_keeps_only_id_named_assets() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.mp3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("12.mp3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("dQw4w9WgXcQ.mp3"), b"partial download").unwrap();
        fs::write(dir.path().join("3.webm"), b"other codec").unwrap();
        fs::write(dir.path().join("012.mp3"), b"not a canonical name").unwrap();
        fs::write(dir.path().join("metadata.json"), b"{}").unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("4.mp3"), b"too deep").unwrap();

        let mut ids: Vec<String> = scan_assets(dir.path(), "mp3")
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1".to_string(), "12".to_string()]);
    }

    #[test]
    fn scan_leaves_duration_empty_for_undecodable_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("7.mp3"), b"garbage").unwrap();
        let assets = scan_assets(dir.path(), "mp3");
        assert_eq!(assets.len(), 1);
        assert!(assets[0].duration.is_none());
    }
}

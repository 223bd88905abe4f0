use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tuneshelf/config.toml` or `~/.config/tuneshelf/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TUNESHELF__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub download: DownloadSettings,
    pub spotify: SpotifySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Root directory holding `Songs/` and `Lists/`.
    /// Unset means `$XDG_DATA_HOME/tuneshelf` (or `~/.local/share/tuneshelf`).
    pub data_dir: Option<PathBuf>,
    /// Name of the directory (under `data_dir`) holding audio assets and the metadata index.
    pub songs_dir: String,
    /// Name of the directory (under `data_dir`) holding one document per playlist.
    pub lists_dir: String,
    /// Extension of downloaded assets; also the codec handed to the downloader.
    pub audio_format: String,
    /// When set, `delete` requires this password as its second argument.
    pub delete_password: Option<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            songs_dir: "Songs".to_string(),
            lists_dir: "Lists".to_string(),
            audio_format: "mp3".to_string(),
            delete_password: None,
        }
    }
}

/// Hard upper bound on volume, in percent of the sink's maximum.
/// `playback.max_volume` may lower it but never raise it.
pub const VOLUME_CEILING: u8 = 50;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Volume applied to the sink at startup (percent of the sink's maximum).
    pub default_volume: u8,
    /// Highest volume a user may request (percent of the sink's maximum),
    /// at most [`VOLUME_CEILING`].
    pub max_volume: u8,
    /// How often the monitor polls the sink for track completion (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 30,
            max_volume: 50,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Program used to search and fetch remote audio.
    pub ytdlp_program: String,
    /// Bitrate handed to the extractor's audio conversion (kbit/s).
    pub audio_quality: String,
    /// How many search results to ask for when matching by name.
    pub search_results: usize,
    /// Candidates whose title contains one of these (case-insensitive) are never picked.
    pub denylist: Vec<String>,
    /// Candidates longer than this are never picked (seconds).
    pub max_duration_secs: u64,
    /// Appended to name searches to steer results towards studio recordings.
    pub query_suffix: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            ytdlp_program: "yt-dlp".to_string(),
            audio_quality: "192".to_string(),
            search_results: 5,
            denylist: vec!["podcast".into(), "interview".into(), "live".into()],
            max_duration_secs: 600,
            query_suffix: "official audio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    pub token_url: String,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base: "https://api.spotify.com/v1".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    /// `RUST_LOG` still wins when set.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

use std::{env, path::PathBuf};

use super::schema::{Settings, VOLUME_CEILING};

/// Configuration loading helpers.
///
/// `Settings::load` reads the optional config file first, then lets environment
/// variables (prefix `TUNESHELF__`) override it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TUNESHELF")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("download.denylist")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.playback;
        if p.max_volume == 0 || p.max_volume > VOLUME_CEILING {
            return Err(format!(
                "playback.max_volume must be within 1..={VOLUME_CEILING}"
            ));
        }
        if p.default_volume > p.max_volume {
            return Err(format!(
                "playback.default_volume ({}) exceeds playback.max_volume ({})",
                p.default_volume, p.max_volume
            ));
        }
        if p.poll_interval_ms == 0 {
            return Err("playback.poll_interval_ms must be >= 1".to_string());
        }
        let format = self.library.audio_format.trim();
        if format.is_empty() || format.contains(['.', '/', '\\']) {
            return Err("library.audio_format must be a bare extension like \"mp3\"".to_string());
        }
        if self.download.search_results == 0 {
            return Err("download.search_results must be >= 1".to_string());
        }
        if self.log.level.trim().parse::<log::LevelFilter>().is_err() {
            return Err(format!(
                "log.level \"{}\" must be one of off, error, warn, info, debug, trace",
                self.log.level
            ));
        }
        Ok(())
    }

    /// Directory holding `Songs/` and `Lists/`.
    pub fn data_dir(&self) -> PathBuf {
        self.library
            .data_dir
            .clone()
            .or_else(default_data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.data_dir().join(&self.library.songs_dir)
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.data_dir().join(&self.library.lists_dir)
    }
}

/// Resolve the config path from `TUNESHELF_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TUNESHELF_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tuneshelf/config.toml`
/// or `~/.config/tuneshelf/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("tuneshelf").join("config.toml"))
}

/// `$XDG_DATA_HOME/tuneshelf`, or `~/.local/share/tuneshelf` when `XDG_DATA_HOME` is not set.
pub fn default_data_dir() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("tuneshelf"))
}

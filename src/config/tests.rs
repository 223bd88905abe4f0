use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_explicit_env_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("TUNESHELF_CONFIG_PATH", "/tmp/tuneshelf-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        PathBuf::from("/tmp/tuneshelf-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_config_path().unwrap(),
        PathBuf::from("/tmp/xdg-config-home")
            .join("tuneshelf")
            .join("config.toml")
    );
}

#[test]
fn default_data_dir_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_data_dir().unwrap(),
        PathBuf::from("/tmp/home-dir/.local/share/tuneshelf")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[library]
data_dir = "/srv/music"
audio_format = "opus"
delete_password = "hunter2"

[playback]
default_volume = 20
max_volume = 40
poll_interval_ms = 250

[download]
denylist = ["karaoke"]
max_duration_secs = 420
search_results = 3

[log]
level = "debug"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("TUNESHELF_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("TUNESHELF__PLAYBACK__MAX_VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.library.data_dir, Some(PathBuf::from("/srv/music")));
    assert_eq!(s.songs_dir(), PathBuf::from("/srv/music/Songs"));
    assert_eq!(s.lists_dir(), PathBuf::from("/srv/music/Lists"));
    assert_eq!(s.library.audio_format, "opus");
    assert_eq!(s.library.delete_password.as_deref(), Some("hunter2"));
    assert_eq!(s.playback.default_volume, 20);
    assert_eq!(s.playback.max_volume, 40);
    assert_eq!(s.playback.poll_interval_ms, 250);
    assert_eq!(s.download.denylist, vec!["karaoke".to_string()]);
    assert_eq!(s.download.max_duration_secs, 420);
    assert_eq!(s.download.search_results, 3);
    // untouched keys keep their defaults
    assert_eq!(s.download.ytdlp_program, "yt-dlp");
    assert_eq!(s.log.level, "debug");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
max_volume = 50
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("TUNESHELF_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("TUNESHELF__PLAYBACK__MAX_VOLUME", "45");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.max_volume, 45);
}

#[test]
fn validate_rejects_default_volume_above_ceiling() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.playback.default_volume = 60;
    assert!(s.validate().is_err());

    s.playback.default_volume = 10;
    s.playback.max_volume = 0;
    assert!(s.validate().is_err());
}

#[test]
fn validate_keeps_max_volume_under_the_ceiling() {
    let mut s = Settings::default();
    s.playback.max_volume = 50;
    assert!(s.validate().is_ok());

    s.playback.max_volume = 100;
    let err = s.validate().unwrap_err();
    assert!(err.contains("1..=50"), "{err}");

    s.playback.max_volume = 51;
    assert!(s.validate().is_err());
}

#[test]
fn validate_rejects_dotted_audio_format() {
    let mut s = Settings::default();
    s.library.audio_format = ".mp3".into();
    assert!(s.validate().is_err());
}

#[test]
fn validate_rejects_unknown_log_level() {
    let mut s = Settings::default();
    s.log.level = "chatty".into();
    assert!(s.validate().is_err());
    s.log.level = "DEBUG".into();
    assert!(s.validate().is_ok());
}

#[test]
fn settings_render_as_toml() {
    let s = Settings::default();
    let text = toml::to_string_pretty(&s).unwrap();
    assert!(text.contains("[playback]"));
    assert!(text.contains("max_volume = 50"));
}

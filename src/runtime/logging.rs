use std::env;

use log::LevelFilter;

use crate::config::LogSettings;

/// Install the `colog` logger. `RUST_LOG`, when set, overrides `log.level`.
pub fn init(settings: &LogSettings) {
    let level = settings
        .level
        .trim()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Warn);

    let mut clog = colog::default_builder();
    clog.filter(None, level);
    if let Ok(filters) = env::var("RUST_LOG") {
        clog.parse_filters(&filters);
    }
    // A logger may already be installed (tests, embedding); keep that one.
    let _ = clog.try_init();
}

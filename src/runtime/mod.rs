use std::io::{self, BufReader};
use std::sync::Arc;

use log::{info, warn};

use crate::download::{CollectionSource, DownloadPipeline, SpotifySource, YtDlpResolver};
use crate::library::Library;
use crate::playback::{RodioSink, Scheduler};

mod commands;
mod console;
mod display;
mod input;
mod logging;
mod settings;
mod shell;

use console::Console;
use input::Inbox;
use shell::Shell;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, problem) = settings::load_settings();
    logging::init(&settings.log);
    if let Some(problem) = problem {
        warn!("{problem}");
    }

    let library = Arc::new(Library::from_settings(&settings)?);
    info!("library at {}", settings.data_dir().display());

    let sink = Arc::new(RodioSink::open()?);
    let scheduler = Scheduler::new(sink, Arc::clone(&library), &settings.playback);

    let resolver = YtDlpResolver::from_settings(&settings);
    let pipeline = Arc::new(DownloadPipeline::from_settings(
        resolver,
        Arc::clone(&library),
        &settings.download,
    ));

    let spotify = SpotifySource::from_settings(&settings.spotify);
    if !spotify.is_configured() {
        info!("Spotify credentials not set; Spotify links will not resolve");
    }
    let spotify: Arc<dyn CollectionSource> = Arc::new(spotify);

    let mut shell = Shell::new(
        settings,
        library,
        scheduler,
        pipeline,
        spotify,
        Console::stdout(),
    );

    let (tx, inbox) = Inbox::channel();
    input::install_interrupt(tx.clone())?;
    // Not joined: the reader may stay blocked on the terminal until the process ends.
    input::spawn_reader(BufReader::new(io::stdin()), tx)?;
    shell.run(&inbox);
    Ok(())
}

mod catalog;
mod config;
mod download;
mod error;
mod library;
mod playback;
mod playlist;
mod runtime;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Line-oriented output shared by the command loop and the download worker.
#[derive(Clone)]
pub struct Console(Arc<Mutex<Box<dyn Write + Send>>>);

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(out))))
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn line(&self, text: impl Display) {
        let mut out = self.0.lock().unwrap_or_else(|e| e.into_inner());
        // Nowhere left to report a broken terminal.
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    /// Write without a newline, for prompts.
    pub fn prompt(&self, text: &str) {
        let mut out = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let _ = write!(out, "{text}");
        let _ = out.flush();
    }
}

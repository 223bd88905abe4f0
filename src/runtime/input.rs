//! Everything the shell reacts to, funnelled into one channel: typed lines,
//! end of input and Ctrl-C.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl-C or SIGTERM; handled like `exit`.
    Interrupted,
    /// End of input, or every producer is gone.
    Closed,
}

pub struct Inbox {
    rx: Receiver<Input>,
}

impl Inbox {
    pub fn channel() -> (Sender<Input>, Inbox) {
        let (tx, rx) = mpsc::channel();
        (tx, Inbox { rx })
    }

    /// Block until the next input arrives.
    pub fn next(&self) -> Input {
        self.rx.recv().unwrap_or(Input::Closed)
    }
}

/// Forward lines from `input` until it ends, then send [`Input::Closed`].
pub fn spawn_reader(
    input: impl BufRead + Send + 'static,
    tx: Sender<Input>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Input::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("cannot read input: {e}");
                        break;
                    }
                }
            }
            debug!("input closed");
            let _ = tx.send(Input::Closed);
        })
}

/// Route Ctrl-C (and SIGTERM) into the inbox instead of killing the process.
pub fn install_interrupt(tx: Sender<Input>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        debug!("interrupt received");
        let _ = tx.send(Input::Interrupted);
    })
}

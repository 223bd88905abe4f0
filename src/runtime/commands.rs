use thiserror::Error;

use crate::catalog::TrackId;
use crate::playlist::{EditAction, PlaylistId};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    BadArgument(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    Playlist(PlaylistId),
    Track(TrackId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Download(String),
    DownloadSpotify(String),
    Search {
        name: String,
        artist: String,
        album: String,
    },
    Create {
        name: String,
        tracks: Vec<TrackId>,
    },
    Edit {
        playlist: PlaylistId,
        action: EditAction,
        tracks: Vec<TrackId>,
    },
    Delete {
        target: DeleteTarget,
        password: Option<String>,
    },
    Play(PlaylistId),
    PlaySong(TrackId),
    Next,
    Stop,
    Volume(u32),
    Check(PlaylistId),
    Lists,
    Songs,
    ShowList(PlaylistId),
    Cancel,
    Config,
    Help,
    Exit,
}

pub const HELP: &str = "\
Commands (aliases in brackets):
  download [d] <url>                  download a track (Spotify links too)
  download_spotify [ds] <url>         download a Spotify track, playlist or album
  search [sch] <name> [artist] [album]
                                      search by name and download the best match
  cancel [c]                          cancel the running download
  create [cl] <name> [ids..]          create a playlist
  edit [e] <list> add|remove <ids..>  change a playlist
  delete [del] <id> [password]        delete a track (e.g. 12) or a playlist (e.g. 3L)
  check [ch] <list>                   look for missing tracks and offer to drop them
  lists [l]                           show playlists
  songs [sh]                          show downloaded tracks
  showlist [sl] <list>                show a playlist's tracks
  play [pl] <list>                    shuffle through a playlist
  play_song [ps] <id>                 play one track
  next [n, pass, p]                   skip to another track
  stop [s]                            stop playback
  volume [v] <level>                  set the volume in percent
  config                              show the effective settings
  help [h]                            show this text
  exit                                stop playback and quit
Quote arguments containing spaces: search \"bohemian rhapsody\" queen";

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        return Err(CommandError::BadArgument("unterminated quote".to_string()));
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn track_ids(args: &[String]) -> Result<Vec<TrackId>, CommandError> {
    args.iter().map(|a| parse_arg(a)).collect()
}

fn parse_arg<T>(arg: &str) -> Result<T, CommandError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    arg.parse().map_err(|e: T::Err| CommandError::BadArgument(e.to_string()))
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let tokens = tokenize(line)?;
        let Some((word, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let arg = |n: usize, usage: &'static str| {
            args.get(n)
                .map(String::as_str)
                .ok_or(CommandError::Usage(usage))
        };
        let opt = |n: usize| args.get(n).cloned().unwrap_or_default();

        let cmd = match word.to_lowercase().as_str() {
            "download" | "d" => Self::Download(arg(0, "download <url>")?.to_string()),
            "download_spotify" | "ds" => {
                Self::DownloadSpotify(arg(0, "download_spotify <url>")?.to_string())
            }
            "search" | "sch" => Self::Search {
                name: arg(0, "search <name> [artist] [album]")?.to_string(),
                artist: opt(1),
                album: opt(2),
            },
            "create" | "cl" => Self::Create {
                name: arg(0, "create <name> [ids..]")?.to_string(),
                tracks: track_ids(&args[1..])?,
            },
            "edit" | "e" => {
                const USAGE: &str = "edit <list> add|remove <ids..>";
                let playlist = parse_arg(arg(0, USAGE)?)?;
                let action = parse_arg(arg(1, USAGE)?)?;
                if args.len() < 3 {
                    return Err(CommandError::Usage(USAGE));
                }
                Self::Edit {
                    playlist,
                    action,
                    tracks: track_ids(&args[2..])?,
                }
            }
            "delete" | "del" => {
                let raw = arg(0, "delete <id> [password]")?;
                let target = if raw.ends_with(['L', 'l']) {
                    DeleteTarget::Playlist(parse_arg(raw)?)
                } else {
                    DeleteTarget::Track(parse_arg(raw)?)
                };
                Self::Delete {
                    target,
                    password: args.get(1).cloned(),
                }
            }
            "play" | "pl" => Self::Play(parse_arg(arg(0, "play <list>")?)?),
            "play_song" | "ps" => Self::PlaySong(parse_arg(arg(0, "play_song <id>")?)?),
            "next" | "n" | "pass" | "p" => Self::Next,
            "stop" | "s" => Self::Stop,
            "volume" | "v" => {
                let raw = arg(0, "volume <level>")?;
                Self::Volume(raw.parse().map_err(|_| {
                    CommandError::BadArgument(format!("'{raw}' is not a volume level"))
                })?)
            }
            "check" | "ch" => Self::Check(parse_arg(arg(0, "check <list>")?)?),
            "lists" | "l" => Self::Lists,
            "songs" | "sh" => Self::Songs,
            "showlist" | "sl" => Self::ShowList(parse_arg(arg(0, "showlist <list>")?)?),
            "cancel" | "c" => Self::Cancel,
            "config" => Self::Config,
            "help" | "h" => Self::Help,
            "exit" => Self::Exit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

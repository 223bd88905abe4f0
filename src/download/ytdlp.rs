use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::config::Settings;

use super::resolver::{Candidate, ResolveError, TrackResolver};

/// [`TrackResolver`] backed by the `yt-dlp` command-line program.
pub struct YtDlpResolver {
    program: String,
    audio_format: String,
    audio_quality: String,
    search_results: usize,
}

/// The subset of `yt-dlp --dump-json` output we read.
#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl Entry {
    fn into_candidate(self) -> Candidate {
        let url = self
            .webpage_url
            .or(self.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));
        Candidate {
            title: self.title.unwrap_or_else(|| self.id.clone()),
            duration: self
                .duration
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
            remote_id: self.id,
            url,
        }
    }
}

impl YtDlpResolver {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            program: settings.download.ytdlp_program.clone(),
            audio_format: settings.library.audio_format.clone(),
            audio_quality: settings.download.audio_quality.clone(),
            search_results: settings.download.search_results.max(1),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, ResolveError> {
        debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ResolveError::Transport(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TrackResolver for YtDlpResolver {
    fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError> {
        let target = format!("ytsearch{}:{query}", self.search_results);
        let stdout = self.run(&["--flat-playlist", "--dump-json", "--no-warnings", &target])?;
        parse_entries(&stdout)
    }

    fn probe(&self, url: &str) -> Result<Candidate, ResolveError> {
        let stdout = self.run(&["--dump-json", "--no-playlist", "--no-warnings", url])?;
        parse_entries(&stdout)?
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound(url.to_string()))
    }

    fn fetch(&self, candidate: &Candidate, destination: &Path) -> Result<PathBuf, ResolveError> {
        // yt-dlp picks the extension itself; converting to our format makes it predictable.
        let template = format!("{}.%(ext)s", destination.with_extension("").display());
        self.run(&[
            "--extract-audio",
            "--audio-format",
            &self.audio_format,
            "--audio-quality",
            &self.audio_quality,
            "--no-playlist",
            "--no-warnings",
            "--quiet",
            "--output",
            &template,
            &candidate.url,
        ])?;

        let produced = destination.with_extension(&self.audio_format);
        if produced.is_file() {
            Ok(produced)
        } else {
            Err(ResolveError::Transport(format!(
                "{} finished without producing {}",
                self.program,
                produced.display()
            )))
        }
    }
}

fn parse_entries(stdout: &str) -> Result<Vec<Candidate>, ResolveError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<Entry>(line)
                .map(Entry::into_candidate)
                .map_err(|e| ResolveError::Transport(format!("unreadable yt-dlp output: {e}")))
        })
        .collect()
}

fn classify_failure(stderr: &str) -> ResolveError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string();
    let lowered = message.to_ascii_lowercase();
    let missing = [
        "video unavailable",
        "is not available",
        "does not exist",
        "404",
        "unsupported url",
        "no video formats",
    ];
    if missing.iter().any(|needle| lowered.contains(needle)) {
        ResolveError::NotFound(message)
    } else {
        ResolveError::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_search_lines() {
        let stdout = concat!(
            r#"{"id":"abc123","title":"Song (Official Audio)","duration":212.0,"url":"https://www.youtube.com/watch?v=abc123"}"#,
            "\n\n",
            r#"{"id":"zzz","title":null,"duration":null}"#,
            "\n",
        );
        let candidates = parse_entries(stdout).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Song (Official Audio)");
        assert_eq!(candidates[0].duration, Some(Duration::from_secs(212)));
        assert_eq!(candidates[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(candidates[1].title, "zzz");
        assert_eq!(candidates[1].duration, None);
        assert_eq!(candidates[1].url, "https://www.youtube.com/watch?v=zzz");
    }

    #[test]
    fn garbage_output_is_a_transport_error() {
        assert!(matches!(
            parse_entries("WARNING: not json"),
            Err(ResolveError::Transport(_))
        ));
    }

    #[test]
    fn unavailable_videos_are_not_found() {
        let stderr = "[youtube] x: Downloading webpage\nERROR: [youtube] x: Video unavailable\n";
        assert_eq!(
            classify_failure(stderr),
            ResolveError::NotFound("ERROR: [youtube] x: Video unavailable".to_string())
        );
        assert!(matches!(
            classify_failure("ERROR: Unable to download webpage: timed out"),
            ResolveError::Transport(_)
        ));
    }

    #[test]
    fn missing_program_is_a_transport_error() {
        let mut settings = Settings::default();
        settings.download.ytdlp_program = "tuneshelf-no-such-program".to_string();
        let resolver = YtDlpResolver::from_settings(&settings);
        assert!(matches!(resolver.search("anything"), Err(ResolveError::Transport(_))));
    }
}

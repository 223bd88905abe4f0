use std::time::Duration;

use crate::config::DownloadSettings;

use super::resolver::Candidate;

/// Picks one search result out of many.
///
/// A candidate is rejected when its title contains a denylisted word
/// (case-insensitive) or when it is longer than `max_duration`. Unknown
/// durations pass. The first survivor wins.
#[derive(Clone, Debug)]
pub struct SelectionPolicy {
    denylist: Vec<String>,
    max_duration: Duration,
}

impl SelectionPolicy {
    pub fn new<S: AsRef<str>>(denylist: &[S], max_duration: Duration) -> Self {
        Self {
            denylist: denylist
                .iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
            max_duration,
        }
    }

    pub fn from_settings(settings: &DownloadSettings) -> Self {
        Self::new(
            &settings.denylist,
            Duration::from_secs(settings.max_duration_secs),
        )
    }

    pub fn accepts(&self, candidate: &Candidate) -> bool {
        let title = candidate.title.to_lowercase();
        if self.denylist.iter().any(|word| title.contains(word.as_str())) {
            return false;
        }
        candidate.duration.is_none_or(|d| d <= self.max_duration)
    }

    pub fn select<'a>(&self, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        candidates.iter().find(|c| self.accepts(c))
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_settings(&DownloadSettings::default())
    }
}

use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::SpotifySettings;

use super::resolver::{
    CollectionSource, RemoteCollection, RemoteItem, ResolveError, TrackDescriptor,
};

/// Refresh a little before the server-side expiry.
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
enum SpotifyLink {
    Track(String),
    Playlist(String),
    Album(String),
}

/// Accepts `https://open.spotify.com/<kind>/<id>?...` and `spotify:<kind>:<id>`.
fn parse_link(url: &str) -> Option<SpotifyLink> {
    let url = url.trim();
    let (kind, rest) = if let Some(uri) = url.strip_prefix("spotify:") {
        uri.split_once(':')?
    } else {
        ["track", "playlist", "album"]
            .into_iter()
            .find_map(|kind| {
                url.split_once(&format!("/{kind}/"))
                    .map(|(_, rest)| (kind, rest))
            })?
    };
    let id = rest
        .split(['?', '/', '#'])
        .next()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))?
        .to_string();
    match kind {
        "track" => Some(SpotifyLink::Track(id)),
        "playlist" => Some(SpotifyLink::Playlist(id)),
        "album" => Some(SpotifyLink::Album(id)),
        _ => None,
    }
}

/// Whether `url` points at something [`SpotifySource`] can resolve.
pub fn is_spotify_link(url: &str) -> bool {
    parse_link(url).is_some()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Named>,
    #[serde(default)]
    album: Option<Named>,
}

impl Track {
    fn descriptor(&self, album: Option<&str>) -> TrackDescriptor {
        let artist = self.artists.first().map(|a| a.name.as_str()).unwrap_or("");
        let album = album
            .or(self.album.as_ref().map(|a| a.name.as_str()))
            .unwrap_or("");
        TrackDescriptor::new(&self.name, artist, album)
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    // null for removed or local-only entries
    #[serde(default)]
    track: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Playlist {
    name: String,
    tracks: Page<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct Album {
    name: String,
    tracks: Page<Track>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// [`CollectionSource`] for Spotify track, playlist and album links, using the
/// client-credentials flow.
pub struct SpotifySource {
    http_client: ureq::Agent,
    credentials: Option<(String, String)>,
    api_base: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifySource {
    pub fn from_settings(settings: &SpotifySettings) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .build();
        let credentials = match (&settings.client_id, &settings.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        };
        Self {
            http_client,
            credentials,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token_url: settings.token_url.clone(),
            token: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn access_token(&self) -> Result<String, ResolveError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let (id, secret) = self.credentials.as_ref().ok_or_else(|| {
            ResolveError::Transport(
                "Spotify credentials missing; set spotify.client_id and spotify.client_secret"
                    .to_string(),
            )
        })?;
        let basic = STANDARD.encode(format!("{id}:{secret}"));
        let response: TokenResponse = self
            .http_client
            .post(&self.token_url)
            .set("Authorization", &format!("Basic {basic}"))
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(classify_http_failure)?
            .into_json()
            .map_err(|e| ResolveError::Transport(format!("token response parse failed: {e}")))?;

        debug!("obtained Spotify access token valid for {}s", response.expires_in);
        let value = response.access_token.clone();
        *cached = Some(AccessToken {
            value: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(value)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResolveError> {
        let token = self.access_token()?;
        debug!("GET {url}");
        self.http_client
            .get(url)
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(classify_http_failure)?
            .into_json()
            .map_err(|e| ResolveError::Transport(format!("Spotify response parse failed: {e}")))
    }

    /// Follow `next` links until the listing is exhausted.
    fn drain<T: DeserializeOwned>(&self, mut page: Page<T>) -> Result<Vec<T>, ResolveError> {
        let mut items = std::mem::take(&mut page.items);
        while let Some(next) = page.next.take() {
            page = self.get_json(&next)?;
            items.append(&mut page.items);
        }
        Ok(items)
    }
}

impl CollectionSource for SpotifySource {
    fn resolve(&self, url: &str) -> Result<RemoteItem, ResolveError> {
        let link = parse_link(url).ok_or_else(|| {
            ResolveError::NotFound(format!("'{url}' is not a Spotify track, playlist or album link"))
        })?;
        match link {
            SpotifyLink::Track(id) => {
                let track: Track = self.get_json(&format!("{}/tracks/{id}", self.api_base))?;
                Ok(RemoteItem::Track(track.descriptor(None)))
            }
            SpotifyLink::Playlist(id) => {
                let playlist: Playlist =
                    self.get_json(&format!("{}/playlists/{id}", self.api_base))?;
                let tracks = self
                    .drain(playlist.tracks)?
                    .into_iter()
                    .filter_map(|item| item.track)
                    .map(|track| track.descriptor(None))
                    .collect();
                Ok(RemoteItem::Collection(RemoteCollection {
                    name: playlist.name,
                    tracks,
                }))
            }
            SpotifyLink::Album(id) => {
                let album: Album = self.get_json(&format!("{}/albums/{id}", self.api_base))?;
                let name = album.name;
                let tracks = self
                    .drain(album.tracks)?
                    .iter()
                    .map(|track| track.descriptor(Some(name.as_str())))
                    .collect();
                Ok(RemoteItem::Collection(RemoteCollection { name, tracks }))
            }
        }
    }
}

fn classify_http_failure(error: ureq::Error) -> ResolveError {
    match error {
        ureq::Error::Status(404, _) => ResolveError::NotFound("Spotify returned 404".to_string()),
        ureq::Error::Status(code, _) => ResolveError::Transport(format!("Spotify returned HTTP {code}")),
        ureq::Error::Transport(transport) => ResolveError::Transport(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_web_links_and_uris() {
        assert_eq!(
            parse_link("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc"),
            Some(SpotifyLink::Track("4uLU6hMCjMI75M1A2tKUQC".to_string()))
        );
        assert_eq!(
            parse_link("https://open.spotify.com/intl-de/album/1DFixLWuPkv3KT3TnV35m3"),
            Some(SpotifyLink::Album("1DFixLWuPkv3KT3TnV35m3".to_string()))
        );
        assert_eq!(
            parse_link("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"),
            Some(SpotifyLink::Playlist("37i9dQZF1DXcBWIGoYBM5M".to_string()))
        );
        assert_eq!(parse_link("https://open.spotify.com/artist/0OdUWJ0sBjDrqHygGUXeCF"), None);
        assert_eq!(parse_link("https://open.spotify.com/track/"), None);
        assert_eq!(parse_link("https://www.youtube.com/watch?v=abc"), None);
        assert!(is_spotify_link("spotify:track:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!is_spotify_link("https://youtu.be/abc"));
    }

    #[test]
    fn playlist_documents_skip_null_tracks() {
        let raw = r#"{
            "name": "Road Trip",
            "tracks": {
                "items": [
                    {"track": {"name": "First", "artists": [{"name": "A"}, {"name": "B"}], "album": {"name": "X"}}},
                    {"track": null},
                    {"track": {"name": "Second", "artists": [], "album": null}}
                ],
                "next": null
            }
        }"#;
        let playlist: Playlist = serde_json::from_str(raw).unwrap();
        let tracks: Vec<TrackDescriptor> = playlist
            .tracks
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(|track| track.descriptor(None))
            .collect();
        assert_eq!(
            tracks,
            vec![
                TrackDescriptor::new("First", "A", "X"),
                TrackDescriptor::new("Second", "", ""),
            ]
        );
        assert_eq!(tracks[0].display_title(), "First - A");
    }

    #[test]
    fn album_tracks_take_the_album_name() {
        let raw = r#"{
            "name": "Record",
            "tracks": {"items": [{"name": "One", "artists": [{"name": "Band"}]}], "next": "https://api.spotify.com/v1/albums/x/tracks?offset=50"}
        }"#;
        let album: Album = serde_json::from_str(raw).unwrap();
        assert!(album.tracks.next.is_some());
        assert_eq!(
            album.tracks.items[0].descriptor(Some(album.name.as_str())),
            TrackDescriptor::new("One", "Band", "Record")
        );
    }

    #[test]
    fn missing_credentials_fail_before_any_request() {
        let source = SpotifySource::from_settings(&SpotifySettings::default());
        assert!(!source.is_configured());
        assert!(matches!(
            source.resolve("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            Err(ResolveError::Transport(_))
        ));
        assert!(matches!(
            source.resolve("not a link"),
            Err(ResolveError::NotFound(_))
        ));
    }
}

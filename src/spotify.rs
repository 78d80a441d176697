//! Spotify Web API access.
//!
//! The rest of the crate talks to the service only through [`ListeningSource`],
//! so the pipeline can be driven by [`SpotifyClient`] in production and by a
//! fixture or an in-memory fake in tests.

use crate::error::{JourneyError, JourneyResult};
use crate::model::{PlayEvent, UNKNOWN_ARTIST};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub trait ListeningSource {
    /// Newest-first page of play events, at most `limit` long.
    fn recently_played(&self, limit: u8) -> JourneyResult<Vec<PlayEvent>>;

    /// Genre labels of one artist. An empty vector is a valid answer.
    fn artist_genres(&self, artist_id: &str) -> JourneyResult<Vec<String>>;
}

/// Authenticated handle injected into the client. How the token was obtained
/// is not this crate's concern.
#[derive(Debug, Clone)]
pub struct SpotifySession {
    access_token: String,
    api_base: String,
}

impl SpotifySession {
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

pub struct SpotifyClient {
    http: Client,
    session: SpotifySession,
}

impl SpotifyClient {
    pub fn new(session: SpotifySession) -> JourneyResult<Self> {
        if session.access_token.trim().is_empty() {
            return Err(JourneyError::Config(String::from(
                "session has an empty access token",
            )));
        }
        let http = Client::builder()
            .user_agent(concat!("journey/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| JourneyError::upstream("http client setup", err.to_string()))?;
        Ok(Self { http, session })
    }

    fn get(&self, operation: &str, url: &str, query: &[(&str, String)]) -> JourneyResult<Response> {
        debug!(operation, url, "spotify request");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.session.access_token)
            .query(query)
            .send()
            .map_err(|err| JourneyError::upstream(operation, err.to_string()))?;
        check_status(operation, response)
    }
}

impl ListeningSource for SpotifyClient {
    fn recently_played(&self, limit: u8) -> JourneyResult<Vec<PlayEvent>> {
        let operation = "recently played";
        let url = format!("{}/me/player/recently-played", self.session.api_base);
        let response = self.get(operation, &url, &[("limit", limit.to_string())])?;
        let body: RecentlyPlayedResponse = response
            .json()
            .map_err(|err| JourneyError::upstream(operation, format!("invalid body: {err}")))?;
        Ok(body.into_play_events())
    }

    fn artist_genres(&self, artist_id: &str) -> JourneyResult<Vec<String>> {
        let operation = "artist lookup";
        let url = format!("{}/artists/{artist_id}", self.session.api_base);
        let response = self.get(operation, &url, &[])?;
        let body: ArtistResponse = response
            .json()
            .map_err(|err| JourneyError::upstream(operation, format!("invalid body: {err}")))?;
        Ok(body.genres)
    }
}

fn check_status(operation: &str, response: Response) -> JourneyResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(JourneyError::upstream(operation, status_message(status)))
}

fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("session is not authenticated ({status})")
        }
        StatusCode::TOO_MANY_REQUESTS => format!("rate limited ({status})"),
        other => format!("unexpected status {other}"),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default)]
    items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Deserialize)]
struct PlayHistoryItem {
    track: WireTrack,
    played_at: String,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    #[serde(default)]
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    genres: Vec<String>,
}

impl RecentlyPlayedResponse {
    /// Only the first credited artist is kept; it is the one genres are
    /// resolved for.
    pub fn into_play_events(self) -> Vec<PlayEvent> {
        self.items
            .into_iter()
            .map(|item| {
                let (artist_id, artist_name) = item
                    .track
                    .artists
                    .into_iter()
                    .next()
                    .map(|artist| (artist.id.unwrap_or_default(), artist.name))
                    .unwrap_or_else(|| (String::new(), UNKNOWN_ARTIST.to_string()));
                PlayEvent {
                    track_id: item.track.id.unwrap_or_default(),
                    track_name: item.track.name,
                    artist_id,
                    artist_name,
                    played_at: item.played_at,
                }
            })
            .collect()
    }
}

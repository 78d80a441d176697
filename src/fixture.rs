use crate::error::{JourneyError, JourneyResult};
use crate::model::PlayEvent;
use crate::spotify::{ListeningSource, RecentlyPlayedResponse};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FixtureFile {
    recently_played: RecentlyPlayedResponse,
    #[serde(default)]
    artists: HashMap<String, Vec<String>>,
}

/// Listening source replayed from a JSON capture: a recently-played response
/// in the service's own shape plus an artist id to genres map.
///
/// Artists absent from the map answer like a failed lookup.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    events: Vec<PlayEvent>,
    artists: HashMap<String, Vec<String>>,
}

impl FixtureSource {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse fixture {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(raw)?;
        Ok(Self {
            events: file.recently_played.into_play_events(),
            artists: file.artists,
        })
    }

    pub fn new(events: Vec<PlayEvent>, artists: HashMap<String, Vec<String>>) -> Self {
        Self { events, artists }
    }
}

impl ListeningSource for FixtureSource {
    fn recently_played(&self, limit: u8) -> JourneyResult<Vec<PlayEvent>> {
        Ok(self
            .events
            .iter()
            .take(usize::from(limit))
            .cloned()
            .collect())
    }

    fn artist_genres(&self, artist_id: &str) -> JourneyResult<Vec<String>> {
        self.artists.get(artist_id).cloned().ok_or_else(|| {
            JourneyError::upstream("artist lookup", format!("no artist {artist_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FIXTURE: &str = r#"{
        "recently_played": {
            "items": [
                {"track": {"id": "t1", "name": "One", "artists": [{"id": "a1", "name": "A"}]},
                 "played_at": "2024-05-01T10:00:00Z"},
                {"track": {"id": "t2", "name": "Two", "artists": [{"id": "a2", "name": "B"}]},
                 "played_at": "2024-05-01T09:00:00Z"}
            ]
        },
        "artists": {"a1": ["pop", "rock"], "a2": []}
    }"#;

    #[test]
    fn loads_fixture_from_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("capture.json");
        fs::write(&path, FIXTURE).expect("write");

        let source = FixtureSource::load(&path).expect("load");
        let events = source.recently_played(50).expect("events");
        assert_eq!(events.len(), 2);
        assert_eq!(
            source.artist_genres("a1").expect("genres"),
            vec![String::from("pop"), String::from("rock")]
        );
        assert!(source.artist_genres("a2").expect("genres").is_empty());
    }

    #[test]
    fn respects_page_limit() {
        let source = FixtureSource::from_json(FIXTURE).expect("parse");
        let events = source.recently_played(1).expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].track_id, "t1");
    }

    #[test]
    fn unknown_artist_is_an_upstream_failure() {
        let source = FixtureSource::from_json(FIXTURE).expect("parse");
        let err = source.artist_genres("zzz").expect_err("should fail");
        assert!(err.is_upstream());
    }

    #[test]
    fn unreadable_fixture_mentions_path() {
        let err = FixtureSource::load(Path::new("/definitely/missing.json")).expect_err("fail");
        assert!(format!("{err:#}").contains("missing.json"));
    }
}

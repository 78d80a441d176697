use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const UNKNOWN_GENRE: &str = "Unknown";
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// One listening occurrence as reported by the streaming service.
///
/// `played_at` is kept in its service-native textual form; parsing happens in
/// the window filter so a single bad timestamp only drops that event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub track_id: String,
    pub track_name: String,
    pub artist_id: String,
    pub artist_name: String,
    pub played_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub song: String,
    pub artist: String,
    pub genres: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub played_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: u8,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Substitute the placeholder genre and keep the record.
    #[default]
    Fallback,
    /// Drop the record whose artist lookup failed.
    Skip,
    /// Fail the whole run.
    Abort,
}

impl LookupFailurePolicy {
    pub fn label(self) -> &'static str {
        match self {
            Self::Fallback => "fallback",
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fallback" => Some(Self::Fallback),
            "skip" => Some(Self::Skip),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    PitchBlack,
    Matrix,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::PitchBlack => "pitch black",
            Self::Matrix => "matrix",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::PitchBlack,
            Self::PitchBlack => Self::Matrix,
            Self::Matrix => Self::Dark,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    #[serde(default = "default_page_limit")]
    pub page_limit: u8,
    #[serde(default)]
    pub lookup_failure: LookupFailurePolicy,
    #[serde(default = "default_cache_artist_genres")]
    pub cache_artist_genres: bool,
    #[serde(default)]
    pub theme: Theme,
}

pub const MAX_PAGE_LIMIT: u8 = 50;

fn default_lookback_hours() -> u32 {
    72
}

fn default_page_limit() -> u8 {
    MAX_PAGE_LIMIT
}

fn default_cache_artist_genres() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
            page_limit: default_page_limit(),
            lookup_failure: LookupFailurePolicy::default(),
            cache_artist_genres: default_cache_artist_genres(),
            theme: Theme::default(),
        }
    }
}

impl Settings {
    pub fn lookback(&self) -> time::Duration {
        time::Duration::hours(i64::from(self.lookback_hours))
    }

    pub fn clamped_page_limit(&self) -> u8 {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"lookback_hours": 24}"#).expect("parse");
        assert_eq!(settings.lookback_hours, 24);
        assert_eq!(settings.page_limit, 50);
        assert_eq!(settings.lookup_failure, LookupFailurePolicy::Fallback);
        assert!(settings.cache_artist_genres);
    }

    #[test]
    fn page_limit_is_clamped_to_service_maximum() {
        let settings = Settings {
            page_limit: 200,
            ..Settings::default()
        };
        assert_eq!(settings.clamped_page_limit(), 50);

        let settings = Settings {
            page_limit: 0,
            ..Settings::default()
        };
        assert_eq!(settings.clamped_page_limit(), 1);
    }

    #[test]
    fn default_lookback_is_three_days() {
        assert_eq!(Settings::default().lookback(), time::Duration::days(3));
    }

    #[test]
    fn theme_cycles_with_readable_labels() {
        let labels: Vec<&str> = [Theme::Dark, Theme::Dark.next(), Theme::Dark.next().next()]
            .into_iter()
            .map(Theme::label)
            .collect();
        assert_eq!(labels, vec!["dark", "pitch black", "matrix"]);
        assert_eq!(Theme::Matrix.next(), Theme::Dark);
    }

    #[test]
    fn lookup_policy_parses_case_insensitively() {
        assert_eq!(
            LookupFailurePolicy::parse(" Skip "),
            Some(LookupFailurePolicy::Skip)
        );
        assert_eq!(LookupFailurePolicy::parse("retry"), None);
    }
}

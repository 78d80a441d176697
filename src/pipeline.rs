use crate::error::JourneyResult;
use crate::genres::GenreResolver;
use crate::history::{WindowedPlay, fetch_history, filter_window, window_start};
use crate::model::{GenreCount, HourCount, LookupFailurePolicy, Settings, TrackRecord};
use crate::spotify::ListeningSource;
use crate::stats::{aggregate_genres, aggregate_hours};
use serde::Serialize;
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub lookback: Duration,
    pub page_limit: u8,
    pub lookup_failure: LookupFailurePolicy,
    pub cache_artist_genres: bool,
    pub local_offset: UtcOffset,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings, local_offset: UtcOffset) -> Self {
        Self {
            lookback: settings.lookback(),
            page_limit: settings.clamped_page_limit(),
            lookup_failure: settings.lookup_failure,
            cache_artist_genres: settings.cache_artist_genres,
            local_offset,
        }
    }
}

/// Everything one run produces. Rebuilt from scratch on every run.
#[derive(Debug, Clone, Serialize)]
pub struct ListeningReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub window_start: OffsetDateTime,
    pub fetched: usize,
    pub malformed: usize,
    pub skipped_lookups: usize,
    pub fallback_lookups: usize,
    pub records: Vec<TrackRecord>,
    pub genres: Vec<GenreCount>,
    pub hours: Vec<HourCount>,
}

pub fn build_track_record(play: WindowedPlay, genres: Vec<String>) -> TrackRecord {
    TrackRecord {
        song: play.event.track_name,
        artist: play.event.artist_name,
        genres,
        played_at: play.played_at,
    }
}

/// Fetch, window, resolve genres sequentially, then aggregate.
///
/// A failed fetch fails the run. Per-event problems (bad timestamps, lookup
/// failures under the skip or fallback policy) only shrink or relabel the
/// result.
pub fn run(
    source: &dyn ListeningSource,
    options: &PipelineOptions,
    now: OffsetDateTime,
) -> JourneyResult<ListeningReport> {
    let events = fetch_history(source, options.page_limit)?;
    let fetched = events.len();

    let window = filter_window(events, now, options.lookback);
    let mut resolver =
        GenreResolver::new(source, options.lookup_failure, options.cache_artist_genres);
    let mut records = Vec::with_capacity(window.kept.len());
    let mut skipped_lookups = 0;

    for play in window.kept {
        match resolver.resolve(&play.event.artist_id)? {
            Some(genres) => records.push(build_track_record(play, genres)),
            None => skipped_lookups += 1,
        }
    }

    let genres = aggregate_genres(&records);
    let hours = aggregate_hours(&records, options.local_offset);
    let resolver_stats = resolver.stats();
    info!(
        fetched,
        kept = records.len(),
        outside_window = window.outside,
        malformed = window.malformed.len(),
        lookups = resolver_stats.lookups,
        cache_hits = resolver_stats.cache_hits,
        genres = genres.len(),
        "listening report built"
    );

    Ok(ListeningReport {
        generated_at: now,
        window_start: window_start(now, options.lookback),
        fetched,
        malformed: window.malformed.len(),
        skipped_lookups,
        fallback_lookups: resolver_stats.fallbacks,
        records,
        genres,
        hours,
    })
}

use std::collections::HashMap;
use std::fs;

use journey::core::{JourneyCore, View};
use journey::fixture::FixtureSource;
use journey::model::{LookupFailurePolicy, Settings};
use journey::pipeline::{self, PipelineOptions};
use journey::stats::HourRange;
use tempfile::tempdir;
use time::macros::{datetime, offset};
use time::{Duration, OffsetDateTime, UtcOffset};

const NOW: OffsetDateTime = datetime!(2024-05-04 12:00:00 UTC);

const CAPTURE: &str = r#"{
    "recently_played": {
        "items": [
            {"track": {"id": "t1", "name": "Midnight City", "artists": [{"id": "m83", "name": "M83"}]},
             "played_at": "2024-05-04T10:40:00.250Z"},
            {"track": {"id": "t2", "name": "Dreams", "artists": [{"id": "fm", "name": "Fleetwood Mac"}]},
             "played_at": "2024-05-03T10:05:00Z"},
            {"track": {"id": "t3", "name": "Unreleased Demo", "artists": [{"id": "nobody", "name": "Nobody"}]},
             "played_at": "2024-05-02T23:30:00Z"},
            {"track": {"id": "t4", "name": "Broken Clock", "artists": [{"id": "m83", "name": "M83"}]},
             "played_at": "half past ten"},
            {"track": {"id": "t5", "name": "Too Old", "artists": [{"id": "fm", "name": "Fleetwood Mac"}]},
             "played_at": "2024-04-20T10:00:00Z"},
            {"track": {"id": "t1", "name": "Midnight City", "artists": [{"id": "m83", "name": "M83"}]},
             "played_at": "2024-05-01T12:00:00Z"}
        ]
    },
    "artists": {
        "m83": ["electropop", "shoegaze"],
        "fm": ["rock"],
        "nobody": []
    }
}"#;

fn options(policy: LookupFailurePolicy, local_offset: UtcOffset) -> PipelineOptions {
    PipelineOptions {
        lookback: Duration::hours(72),
        page_limit: 50,
        lookup_failure: policy,
        cache_artist_genres: true,
        local_offset,
    }
}

fn load_capture() -> FixtureSource {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("capture.json");
    fs::write(&path, CAPTURE).expect("write capture");
    FixtureSource::load(&path).expect("load capture")
}

fn genre_counts(report: &pipeline::ListeningReport) -> HashMap<String, u64> {
    report
        .genres
        .iter()
        .map(|entry| (entry.genre.clone(), entry.count))
        .collect()
}

#[test]
fn capture_produces_window_genres_and_hours() {
    let source = load_capture();
    let report = pipeline::run(
        &source,
        &options(LookupFailurePolicy::Fallback, UtcOffset::UTC),
        NOW,
    )
    .expect("run");

    assert_eq!(report.fetched, 6);
    assert_eq!(report.malformed, 1);
    let songs: Vec<&str> = report
        .records
        .iter()
        .map(|record| record.song.as_str())
        .collect();
    assert_eq!(
        songs,
        vec!["Midnight City", "Dreams", "Unreleased Demo", "Midnight City"]
    );

    assert_eq!(
        genre_counts(&report),
        HashMap::from([
            (String::from("electropop"), 2),
            (String::from("shoegaze"), 2),
            (String::from("rock"), 1),
            (String::from("Unknown"), 1),
        ])
    );

    let label_total: usize = report.records.iter().map(|record| record.genres.len()).sum();
    assert_eq!(
        report.genres.iter().map(|entry| entry.count).sum::<u64>(),
        label_total as u64
    );
    assert_eq!(
        report.hours.iter().map(|entry| entry.count).sum::<u64>(),
        report.records.len() as u64
    );
    let hours: Vec<u8> = report.hours.iter().map(|entry| entry.hour).collect();
    assert_eq!(hours, vec![10, 12, 23]);
}

#[test]
fn window_start_play_is_included() {
    let source = load_capture();
    let report = pipeline::run(
        &source,
        &options(LookupFailurePolicy::Fallback, UtcOffset::UTC),
        NOW,
    )
    .expect("run");
    assert_eq!(report.window_start, datetime!(2024-05-01 12:00 UTC));
    assert!(
        report
            .records
            .iter()
            .any(|record| record.played_at == report.window_start)
    );
}

#[test]
fn local_offset_moves_hour_buckets() {
    let source = load_capture();
    let report = pipeline::run(
        &source,
        &options(LookupFailurePolicy::Fallback, offset!(+3)),
        NOW,
    )
    .expect("run");
    let hours: Vec<u8> = report.hours.iter().map(|entry| entry.hour).collect();
    assert_eq!(hours, vec![2, 13, 15]);
}

#[test]
fn page_limit_bounds_the_fetch() {
    let source = load_capture();
    let mut opts = options(LookupFailurePolicy::Fallback, UtcOffset::UTC);
    opts.page_limit = 2;
    let report = pipeline::run(&source, &opts, NOW).expect("run");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.records.len(), 2);
}

#[test]
fn core_filters_report_by_genre_and_hour() {
    let source = load_capture();
    let settings = Settings::default();
    let mut core = JourneyCore::new(settings, UtcOffset::UTC);
    let report = pipeline::run(&source, &core.pipeline_options(), NOW).expect("run");
    core.apply_report(report);

    core.only_genre("rock");
    let songs: Vec<&str> = core
        .visible_records()
        .iter()
        .map(|record| record.song.as_str())
        .collect();
    assert_eq!(songs, vec!["Dreams"]);

    core.select_all_genres();
    core.query.hours = HourRange::new(11, 23);
    core.set_view(View::Hours);
    let hours: Vec<u8> = core.visible_hours().iter().map(|entry| entry.hour).collect();
    assert_eq!(hours, vec![12, 23]);
    assert_eq!(core.visible_records().len(), 2);
}

#[test]
fn missing_artist_with_abort_policy_fails_the_run() {
    let capture = CAPTURE.replace("\"nobody\": []", "\"someone-else\": []");
    let source = FixtureSource::from_json(&capture).expect("parse");

    let result = pipeline::run(
        &source,
        &options(LookupFailurePolicy::Abort, UtcOffset::UTC),
        NOW,
    );
    assert!(result.is_err());

    let skipped = pipeline::run(
        &source,
        &options(LookupFailurePolicy::Skip, UtcOffset::UTC),
        NOW,
    )
    .expect("run");
    assert_eq!(skipped.skipped_lookups, 1);
    assert_eq!(skipped.records.len(), 3);
}

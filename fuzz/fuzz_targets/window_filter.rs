#![no_main]

use journey::history::{filter_window, parse_played_at};
use journey::model::PlayEvent;
use libfuzzer_sys::fuzz_target;
use time::{Duration, OffsetDateTime};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let _ = parse_played_at(&raw);

    let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
    let lookback = Duration::hours(i64::from(data.first().copied().unwrap_or(72)));
    let events: Vec<PlayEvent> = raw
        .split('\n')
        .take(64)
        .enumerate()
        .map(|(idx, line)| PlayEvent {
            track_id: idx.to_string(),
            track_name: String::from("fuzz"),
            artist_id: String::new(),
            artist_name: String::from("fuzz"),
            played_at: line.to_string(),
        })
        .collect();
    let total = events.len();

    let outcome = filter_window(events, now, lookback);
    assert_eq!(outcome.kept.len() + outcome.malformed.len() + outcome.outside, total);
    assert!(
        outcome
            .kept
            .iter()
            .all(|play| play.played_at >= now - lookback && play.played_at <= now)
    );
});

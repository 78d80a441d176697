use crate::error::{JourneyError, JourneyResult};
use crate::model::{MAX_PAGE_LIMIT, PlayEvent};
use crate::spotify::ListeningSource;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::{info, warn};

/// Single page, no pagination, no retry.
pub fn fetch_history(source: &dyn ListeningSource, limit: u8) -> JourneyResult<Vec<PlayEvent>> {
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);
    let mut events = source.recently_played(limit)?;
    events.truncate(usize::from(limit));
    info!(count = events.len(), limit, "fetched recently played page");
    Ok(events)
}

/// Accepts RFC 3339 (`2024-05-01T10:15:00.123Z`) and the bare
/// `2024-05-01T10:15:00` form, which is read as UTC. Fractional seconds on the
/// bare form are dropped.
pub fn parse_played_at(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }

    let whole_seconds = raw.split('.').next().unwrap_or(raw);
    PrimitiveDateTime::parse(
        whole_seconds,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedPlay {
    pub event: PlayEvent,
    pub played_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct WindowOutcome {
    pub kept: Vec<WindowedPlay>,
    pub malformed: Vec<JourneyError>,
    pub outside: usize,
}

/// Earliest instant still inside the window. Saturates instead of
/// overflowing for absurd lookbacks.
pub fn window_start(now: OffsetDateTime, lookback: Duration) -> OffsetDateTime {
    now.checked_sub(lookback)
        .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_offset(now.offset()))
}

/// Keeps events with `now - lookback <= played_at <= now`, in input order.
/// Events whose timestamp does not parse are reported and dropped.
pub fn filter_window(
    events: Vec<PlayEvent>,
    now: OffsetDateTime,
    lookback: Duration,
) -> WindowOutcome {
    let window_start = window_start(now, lookback);
    let mut outcome = WindowOutcome::default();

    for event in events {
        let Some(played_at) = parse_played_at(&event.played_at) else {
            warn!(
                track_id = %event.track_id,
                raw = %event.played_at,
                "skipping play event with unparsable timestamp"
            );
            outcome.malformed.push(JourneyError::MalformedData {
                track_id: event.track_id,
                raw: event.played_at,
            });
            continue;
        };

        if played_at < window_start || played_at > now {
            outcome.outside += 1;
            continue;
        }
        outcome.kept.push(WindowedPlay { event, played_at });
    }

    outcome
}

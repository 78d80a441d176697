use crate::model::{GenreCount, HourCount, TrackRecord};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use time::{OffsetDateTime, UtcOffset};

pub const HOURS_PER_DAY: usize = 24;

/// Counts every genre label across all records; a record with N genres adds N.
pub fn aggregate_genres(records: &[TrackRecord]) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for genre in records.iter().flat_map(|record| record.genres.iter()) {
        *counts.entry(genre.as_str()).or_default() += 1;
    }

    let mut table: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    table.sort_by(|a, b| compare_genres(a, b, GenreSort::Count));
    table
}

/// One bucket per local hour that has at least one play, ordered by hour.
pub fn aggregate_hours(records: &[TrackRecord], offset: UtcOffset) -> Vec<HourCount> {
    let mut buckets = [0_u64; HOURS_PER_DAY];
    for record in records {
        let hour = local_hour(record.played_at, offset);
        buckets[usize::from(hour)] += 1;
    }

    buckets
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(hour, count)| HourCount {
            hour: hour as u8,
            count: *count,
        })
        .collect()
}

pub fn local_hour(at: OffsetDateTime, offset: UtcOffset) -> u8 {
    at.to_offset(offset).hour()
}

/// Zero-filled 0..=23 series for charts that want every hour on the axis.
pub fn dense_hours(table: &[HourCount]) -> [u64; HOURS_PER_DAY] {
    let mut dense = [0_u64; HOURS_PER_DAY];
    for entry in table {
        if let Some(slot) = dense.get_mut(usize::from(entry.hour)) {
            *slot = entry.count;
        }
    }
    dense
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreSort {
    Count,
    Name,
}

impl GenreSort {
    pub fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Name => "name",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Count => Self::Name,
            Self::Name => Self::Count,
        }
    }
}

/// Inclusive range of local hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    from: u8,
    to: u8,
}

impl Default for HourRange {
    fn default() -> Self {
        Self { from: 0, to: 23 }
    }
}

impl HourRange {
    pub fn new(from: u8, to: u8) -> Self {
        let from = from.min(23);
        let to = to.min(23);
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    pub fn from(self) -> u8 {
        self.from
    }

    pub fn to(self) -> u8 {
        self.to
    }

    pub fn contains(self, hour: u8) -> bool {
        (self.from..=self.to).contains(&hour)
    }

    pub fn shift_from(self, delta: i8) -> Self {
        let from = (i16::from(self.from) + i16::from(delta)).clamp(0, i16::from(self.to)) as u8;
        Self { from, to: self.to }
    }

    pub fn shift_to(self, delta: i8) -> Self {
        let to = (i16::from(self.to) + i16::from(delta)).clamp(i16::from(self.from), 23) as u8;
        Self { from: self.from, to }
    }
}

#[derive(Debug, Clone)]
pub struct ReportQuery {
    /// Genres switched off in the multiselect. Empty means everything shown.
    pub excluded_genres: BTreeSet<String>,
    pub hours: HourRange,
    pub sort: GenreSort,
    pub search: String,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            excluded_genres: BTreeSet::new(),
            hours: HourRange::default(),
            sort: GenreSort::Count,
            search: String::new(),
        }
    }
}

impl ReportQuery {
    pub fn genre_selected(&self, genre: &str) -> bool {
        !self.excluded_genres.contains(genre)
    }

    pub fn toggle_genre(&mut self, genre: &str) {
        if !self.excluded_genres.remove(genre) {
            self.excluded_genres.insert(genre.to_string());
        }
    }

    pub fn select_all_genres(&mut self) {
        self.excluded_genres.clear();
    }

    pub fn select_only(&mut self, genre: &str, table: &[GenreCount]) {
        self.excluded_genres = table
            .iter()
            .filter(|entry| entry.genre != genre)
            .map(|entry| entry.genre.clone())
            .collect();
    }

    pub fn genres(&self, table: &[GenreCount]) -> Vec<GenreCount> {
        let mut rows: Vec<GenreCount> = table
            .iter()
            .filter(|entry| self.genre_selected(&entry.genre))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_genres(a, b, self.sort));
        rows
    }

    pub fn hours(&self, table: &[HourCount]) -> Vec<HourCount> {
        table
            .iter()
            .filter(|entry| self.hours.contains(entry.hour))
            .copied()
            .collect()
    }

    /// Records with at least one selected genre, played inside the hour
    /// range, matching every search token. Newest first, as fetched.
    pub fn records<'r>(
        &self,
        records: &'r [TrackRecord],
        offset: UtcOffset,
    ) -> Vec<&'r TrackRecord> {
        let tokens: Vec<String> = self
            .search
            .split_whitespace()
            .map(|token| token.to_ascii_lowercase())
            .collect();

        records
            .iter()
            .filter(|record| {
                record
                    .genres
                    .iter()
                    .any(|genre| self.genre_selected(genre))
            })
            .filter(|record| self.hours.contains(local_hour(record.played_at, offset)))
            .filter(|record| {
                if tokens.is_empty() {
                    return true;
                }
                let haystack = format!("{} {}", record.song, record.artist).to_ascii_lowercase();
                tokens.iter().all(|token| fuzzy_match(&haystack, token))
            })
            .collect()
    }
}

fn compare_genres(a: &GenreCount, b: &GenreCount, sort: GenreSort) -> Ordering {
    let by_name = || {
        a.genre
            .to_ascii_lowercase()
            .cmp(&b.genre.to_ascii_lowercase())
            .then_with(|| a.genre.cmp(&b.genre))
    };
    match sort {
        GenreSort::Count => b.count.cmp(&a.count).then_with(by_name),
        GenreSort::Name => by_name().then(b.count.cmp(&a.count)),
    }
}

fn fuzzy_match(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || haystack.contains(needle) {
        return true;
    }

    let mut chars = needle.chars();
    let mut target = chars.next();
    for ch in haystack.chars() {
        match target {
            Some(needed) if ch == needed => target = chars.next(),
            Some(_) => {}
            None => return true,
        }
    }
    target.is_none()
}

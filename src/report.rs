use crate::pipeline::ListeningReport;
use crate::stats::ReportQuery;
use std::fmt::{self, Write};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub fn format_local(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| String::from("-"))
}

pub fn bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let filled = ((count as f64 / max as f64) * width as f64).round().max(1.0) as usize;
    "#".repeat(filled.min(width))
}

/// Plain-text rendering of a report for `--print`.
pub fn render_text(report: &ListeningReport, query: &ReportQuery, offset: UtcOffset) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report, query, offset);
    out
}

fn write_report(
    out: &mut String,
    report: &ListeningReport,
    query: &ReportQuery,
    offset: UtcOffset,
) -> fmt::Result {
    let genres = query.genres(&report.genres);
    let hours = query.hours(&report.hours);
    let records = query.records(&report.records, offset);

    writeln!(
        out,
        "Listening since {} ({} fetched, {} in window, {} malformed, {} skipped)",
        format_local(report.window_start, offset),
        report.fetched,
        report.records.len(),
        report.malformed,
        report.skipped_lookups
    )?;

    writeln!(out, "\nGenre frequency")?;
    if genres.is_empty() {
        writeln!(out, "  (no plays)")?;
    }
    let genre_width = genres
        .iter()
        .map(|entry| entry.genre.chars().count())
        .max()
        .unwrap_or(0);
    let genre_max = genres.iter().map(|entry| entry.count).max().unwrap_or(0);
    for entry in &genres {
        writeln!(
            out,
            "  {:<width$}  {:>4}  {}",
            entry.genre,
            entry.count,
            bar(entry.count, genre_max, 30),
            width = genre_width
        )?;
    }

    writeln!(out, "\nPlays by hour of day")?;
    if hours.is_empty() {
        writeln!(out, "  (no plays)")?;
    }
    let hour_max = hours.iter().map(|entry| entry.count).max().unwrap_or(0);
    for entry in &hours {
        writeln!(
            out,
            "  {:02}:00  {:>4}  {}",
            entry.hour,
            entry.count,
            bar(entry.count, hour_max, 30)
        )?;
    }

    writeln!(out, "\nSongs")?;
    for record in records {
        writeln!(
            out,
            "  {}  {} - {}  [{}]",
            format_local(record.played_at, offset),
            record.song,
            record.artist,
            record.genres.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenreCount, HourCount, TrackRecord};
    use time::macros::datetime;

    fn report() -> ListeningReport {
        ListeningReport {
            generated_at: datetime!(2024-05-04 12:00 UTC),
            window_start: datetime!(2024-05-01 12:00 UTC),
            fetched: 3,
            malformed: 1,
            skipped_lookups: 0,
            fallback_lookups: 0,
            records: vec![TrackRecord {
                song: String::from("Midnight City"),
                artist: String::from("M83"),
                genres: vec![String::from("electropop"), String::from("shoegaze")],
                played_at: datetime!(2024-05-03 22:15 UTC),
            }],
            genres: vec![
                GenreCount {
                    genre: String::from("electropop"),
                    count: 1,
                },
                GenreCount {
                    genre: String::from("shoegaze"),
                    count: 1,
                },
            ],
            hours: vec![HourCount { hour: 22, count: 1 }],
        }
    }

    #[test]
    fn text_report_lists_tables_and_songs() {
        let text = render_text(&report(), &ReportQuery::default(), UtcOffset::UTC);
        assert!(text.contains("3 fetched, 1 in window, 1 malformed"));
        assert!(text.contains("electropop"));
        assert!(text.contains("22:00"));
        assert!(text.contains("2024-05-03 22:15  Midnight City - M83  [electropop, shoegaze]"));
    }

    #[test]
    fn empty_report_says_no_plays() {
        let mut empty = report();
        empty.records.clear();
        empty.genres.clear();
        empty.hours.clear();
        let text = render_text(&empty, &ReportQuery::default(), UtcOffset::UTC);
        assert_eq!(text.matches("(no plays)").count(), 2);
    }

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(bar(10, 10, 5), "#####");
        assert_eq!(bar(1, 100, 5), "#");
        assert_eq!(bar(0, 10, 5), "");
    }
}

use crate::core::{JourneyCore, View};
use crate::model::{Theme, TrackRecord};
use crate::report::format_local;
use crate::stats::{HOURS_PER_DAY, dense_hours};
use ratatui::prelude::*;
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row,
    Table, TableState, Wrap,
};

const APP_TITLE_WITH_VERSION: &str = concat!("Journey v", env!("CARGO_PKG_VERSION"), "  ");

#[derive(Clone, Copy)]
struct ThemePalette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    bar: Color,
    selected_bg: Color,
    switch_hint: Color,
}

fn palette(theme: Theme) -> ThemePalette {
    match theme {
        Theme::Dark => ThemePalette {
            bg: Color::Rgb(10, 15, 24),
            panel_bg: Color::Rgb(19, 29, 43),
            panel_alt_bg: Color::Rgb(24, 38, 58),
            border: Color::Rgb(69, 121, 176),
            text: Color::Rgb(214, 228, 248),
            muted: Color::Rgb(149, 173, 204),
            accent: Color::Rgb(100, 203, 184),
            alert: Color::Rgb(249, 174, 88),
            bar: Color::Rgb(30, 215, 96),
            selected_bg: Color::Rgb(34, 55, 82),
            switch_hint: Color::Rgb(255, 122, 165),
        },
        Theme::PitchBlack => ThemePalette {
            bg: Color::Rgb(0, 0, 0),
            panel_bg: Color::Rgb(8, 8, 8),
            panel_alt_bg: Color::Rgb(15, 15, 15),
            border: Color::Rgb(74, 74, 74),
            text: Color::Rgb(242, 242, 242),
            muted: Color::Rgb(150, 150, 150),
            accent: Color::Rgb(212, 212, 212),
            alert: Color::Rgb(235, 176, 97),
            bar: Color::Rgb(190, 190, 190),
            selected_bg: Color::Rgb(26, 26, 26),
            switch_hint: Color::Rgb(255, 133, 168),
        },
        Theme::Matrix => ThemePalette {
            bg: Color::Rgb(4, 12, 4),
            panel_bg: Color::Rgb(8, 22, 8),
            panel_alt_bg: Color::Rgb(12, 30, 12),
            border: Color::Rgb(39, 143, 62),
            text: Color::Rgb(180, 255, 185),
            muted: Color::Rgb(102, 177, 115),
            accent: Color::Rgb(95, 255, 122),
            alert: Color::Rgb(219, 234, 114),
            bar: Color::Rgb(95, 255, 122),
            selected_bg: Color::Rgb(18, 43, 20),
            switch_hint: Color::Rgb(119, 255, 210),
        },
    }
}

pub fn draw(frame: &mut Frame, core: &JourneyCore, command_buffer: &str, command_mode: bool) {
    let colors = palette(core.settings.theme);
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, core, &colors, vertical[0]);

    let body = if core.show_raw && core.view != View::Songs {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(vertical[1]);
        draw_records(frame, core, &colors, split[1], false);
        split[0]
    } else {
        vertical[1]
    };

    match core.view {
        View::Genres => draw_genres(frame, core, &colors, body),
        View::Hours => draw_hours(frame, core, &colors, body),
        View::Songs => draw_records(frame, core, &colors, body, true),
        View::Breakdown => draw_breakdown(frame, core, &colors, body),
    }

    let footer_line = if command_mode {
        Line::from(vec![
            Span::styled(":", Style::default().fg(colors.accent)),
            Span::styled(command_buffer, Style::default().fg(colors.text)),
        ])
    } else {
        Line::from(vec![
            Span::styled(
                "Tab view, Space toggle genre, a all, [ ] from-hour, { } to-hour, s sort, d raw, r refresh, : command, q quit",
                Style::default().fg(colors.muted),
            ),
            Span::styled("  |  ", Style::default().fg(colors.muted)),
            Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
        ])
    };
    let footer = Paragraph::new(footer_line).block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, vertical[2]);
}

fn draw_header(frame: &mut Frame, core: &JourneyCore, colors: &ThemePalette, area: Rect) {
    frame.render_widget(
        panel_block("Status", colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 0,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let window = match &core.report {
        Some(report) => format!(
            "{} plays since {}",
            report.records.len(),
            format_local(report.window_start, core.local_offset)
        ),
        None => String::from("no data"),
    };
    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(window, Style::default().fg(colors.text)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!(
                "Hours {:02}-{:02}",
                core.query.hours.from(),
                core.query.hours.to()
            ),
            Style::default().fg(colors.alert),
        ),
    ]));
    frame.render_widget(left, chunks[0]);

    let right = Paragraph::new(view_tabs_line(core.view, colors)).alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn view_tabs_line(selected: View, colors: &ThemePalette) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "Tab to switch",
        Style::default()
            .fg(colors.switch_hint)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(" - ", Style::default().fg(colors.muted)));

    for (idx, view) in View::ALL.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" -- ", Style::default().fg(colors.muted)));
        }
        let mut style = Style::default().fg(colors.accent);
        if view == selected {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(Span::styled(view.label(), style));
    }

    Line::from(spans)
}

fn draw_genres(frame: &mut Frame, core: &JourneyCore, colors: &ThemePalette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
        .split(area);

    let choices = core.genre_choices();
    let items: Vec<ListItem> = choices
        .iter()
        .map(|entry| {
            let selected = core.query.genre_selected(&entry.genre);
            let (mark, style) = if selected {
                ("[x] ", Style::default().fg(colors.text))
            } else {
                ("[ ] ", Style::default().fg(colors.muted))
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(colors.accent)),
                Span::styled(format!("{} ({})", entry.genre, entry.count), style),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!choices.is_empty()).then_some(core.selected));
    let list = List::new(items)
        .block(panel_block(
            &format!("Select genres (by {})", core.sort().label()),
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, columns[0], &mut state);

    let visible = core.visible_genres();
    let bars: Vec<Bar> = visible
        .iter()
        .map(|entry| {
            Bar::default()
                .value(entry.count)
                .label(Line::from(entry.genre.clone()))
                .text_value(entry.count.to_string())
        })
        .collect();
    let chart = BarChart::default()
        .block(panel_block(
            "Genre frequency",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(colors.bar))
        .value_style(Style::default().fg(colors.bg).bg(colors.bar))
        .label_style(Style::default().fg(colors.text))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, columns[1]);

    if visible.is_empty() {
        draw_empty_hint(frame, colors, columns[1], "No genres to show");
    }
}

fn draw_hours(frame: &mut Frame, core: &JourneyCore, colors: &ThemePalette, area: Rect) {
    let dense = dense_hours(&core.visible_hours());
    let range = core.query.hours;
    let bars: Vec<Bar> = (0..HOURS_PER_DAY)
        .filter(|hour| range.contains(*hour as u8))
        .map(|hour| {
            Bar::default()
                .value(dense[hour])
                .label(Line::from(format!("{hour:02}")))
                .text_value(if dense[hour] > 0 {
                    dense[hour].to_string()
                } else {
                    String::new()
                })
        })
        .collect();

    let chart = BarChart::default()
        .block(panel_block(
            "Plays by hour of day",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .bar_width(2)
        .bar_gap(1)
        .bar_style(Style::default().fg(colors.bar))
        .value_style(Style::default().fg(colors.bg).bg(colors.bar))
        .label_style(Style::default().fg(colors.muted))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);

    if core.records().is_empty() {
        draw_empty_hint(frame, colors, area, "No plays in the lookback window");
    }
}

fn draw_records(
    frame: &mut Frame,
    core: &JourneyCore,
    colors: &ThemePalette,
    area: Rect,
    focused: bool,
) {
    let records = core.visible_records();
    let rows: Vec<Row> = records
        .iter()
        .map(|record| record_row(record, core, colors))
        .collect();
    let widths = [
        Constraint::Length(17),
        Constraint::Percentage(30),
        Constraint::Percentage(25),
        Constraint::Percentage(45),
    ];
    let header = Row::new(["Played", "Song", "Artist", "Genres"]).style(
        Style::default()
            .fg(colors.accent)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(
            &format!("Songs ({})", records.len()),
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .row_highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    if focused && !records.is_empty() {
        state.select(Some(core.selected.min(records.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn record_row<'a>(record: &'a TrackRecord, core: &JourneyCore, colors: &ThemePalette) -> Row<'a> {
    Row::new(vec![
        Cell::from(format_local(record.played_at, core.local_offset))
            .style(Style::default().fg(colors.muted)),
        Cell::from(record.song.as_str()).style(Style::default().fg(colors.text)),
        Cell::from(record.artist.as_str()).style(Style::default().fg(colors.text)),
        Cell::from(record.genres.join(", ")).style(Style::default().fg(colors.alert)),
    ])
}

/// Every genre of the run, hidden ones included, so the highlighted row is
/// always the one Space toggles.
fn draw_breakdown(frame: &mut Frame, core: &JourneyCore, colors: &ThemePalette, area: Rect) {
    let choices = core.genre_choices();
    let total: u64 = choices.iter().map(|entry| entry.count).sum();
    let rows: Vec<Row> = choices
        .iter()
        .map(|entry| {
            let share = if total == 0 {
                0.0
            } else {
                entry.count as f64 * 100.0 / total as f64
            };
            let (mark, color) = if core.query.genre_selected(&entry.genre) {
                ("[x]", colors.text)
            } else {
                ("[ ]", colors.muted)
            };
            Row::new(vec![
                Cell::from(mark).style(Style::default().fg(colors.accent)),
                Cell::from(entry.genre.clone()),
                Cell::from(entry.count.to_string()),
                Cell::from(format!("{share:5.1}%")),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(60),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(["", "Genre", "Count", "Share"]).style(
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block(
        &format!("Genre breakdown ({total} labels)"),
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
    .row_highlight_style(
        Style::default()
            .bg(colors.selected_bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    if !choices.is_empty() {
        state.select(Some(core.selected.min(choices.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_empty_hint(frame: &mut Frame, colors: &ThemePalette, area: Rect, text: &str) {
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(colors.muted)))
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenreCount, HourCount, Settings};
    use crate::pipeline::ListeningReport;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use time::UtcOffset;
    use time::macros::datetime;

    fn core() -> JourneyCore {
        let mut core = JourneyCore::new(Settings::default(), UtcOffset::UTC);
        core.apply_report(ListeningReport {
            generated_at: datetime!(2024-05-04 12:00 UTC),
            window_start: datetime!(2024-05-01 12:00 UTC),
            fetched: 1,
            malformed: 0,
            skipped_lookups: 0,
            fallback_lookups: 0,
            records: vec![TrackRecord {
                song: String::from("Midnight City"),
                artist: String::from("M83"),
                genres: vec![String::from("shoegaze")],
                played_at: datetime!(2024-05-03 22:15 UTC),
            }],
            genres: vec![GenreCount {
                genre: String::from("shoegaze"),
                count: 1,
            }],
            hours: vec![HourCount { hour: 22, count: 1 }],
        });
        core
    }

    fn render(core: &JourneyCore) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).expect("terminal");
        terminal
            .draw(|frame| draw(frame, core, "", false))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn every_view_renders_without_panicking() {
        let mut core = core();
        for view in View::ALL {
            core.set_view(view);
            let screen = render(&core);
            assert!(screen.contains(view.label()));
        }
    }

    #[test]
    fn songs_view_lists_track() {
        let mut core = core();
        core.set_view(View::Songs);
        let screen = render(&core);
        assert!(screen.contains("Midnight City"));
        assert!(screen.contains("2024-05-03 22:15"));
    }

    #[test]
    fn breakdown_keeps_hidden_genres_listed() {
        let mut core = core();
        core.set_view(View::Breakdown);
        core.toggle_selected_genre();
        let screen = render(&core);
        assert!(screen.contains("shoegaze"));
        assert!(!screen.contains("[x]"));
    }

    #[test]
    fn empty_core_renders() {
        let core = JourneyCore::new(Settings::default(), UtcOffset::UTC);
        let screen = render(&core);
        assert!(screen.contains("no data"));
    }
}

use crate::core::{JourneyCore, View};
use crate::model::LookupFailurePolicy;
use crate::pipeline;
use crate::spotify::ListeningSource;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{error, info};

pub fn run(source: &dyn ListeningSource, mut core: JourneyCore) -> Result<()> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut command_mode = false;
    let mut command_buffer = String::new();
    let mut last_tick = Instant::now();

    let result: Result<()> = loop {
        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            if let Err(err) = terminal.draw(|frame| {
                crate::ui::draw(frame, &core, &command_buffer, command_mode)
            }) {
                break Err(err.into());
            }
            core.dirty = false;
            last_tick = Instant::now();
        }

        // Drawn once with the "Fetching" status before blocking on the network.
        if core.refresh_requested && !core.dirty {
            refresh(&mut core, source, OffsetDateTime::now_utc());
            continue;
        }

        match event::poll(Duration::from_millis(33)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }

        let event = match event::read() {
            Ok(event) => event,
            Err(err) => break Err(err.into()),
        };
        if let Event::Mouse(mouse) = event {
            handle_mouse(&mut core, mouse);
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        if command_mode {
            match key.code {
                KeyCode::Esc => {
                    command_mode = false;
                    command_buffer.clear();
                    core.dirty = true;
                }
                KeyCode::Enter => {
                    run_command(&mut core, &command_buffer);
                    command_mode = false;
                    command_buffer.clear();
                }
                KeyCode::Backspace => {
                    command_buffer.pop();
                    core.dirty = true;
                }
                KeyCode::Char(ch) => {
                    command_buffer.push(ch);
                    core.dirty = true;
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Tab => core.cycle_view(),
            KeyCode::Down => core.select_next(),
            KeyCode::Up => core.select_prev(),
            KeyCode::Char(' ') | KeyCode::Enter => core.toggle_selected_genre(),
            KeyCode::Char('a') => core.select_all_genres(),
            KeyCode::Char('[') => core.shift_hours(-1, 0),
            KeyCode::Char(']') => core.shift_hours(1, 0),
            KeyCode::Char('{') => core.shift_hours(0, -1),
            KeyCode::Char('}') => core.shift_hours(0, 1),
            KeyCode::Char('s') => core.cycle_sort(),
            KeyCode::Char('d') => core.toggle_raw(),
            KeyCode::Char('t') => core.cycle_theme(),
            KeyCode::Char('r') => core.request_refresh(),
            KeyCode::Char(':') => {
                command_mode = true;
                core.dirty = true;
            }
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

/// Re-runs the whole pipeline; the previous report is replaced or, on
/// failure, discarded.
fn refresh(core: &mut JourneyCore, source: &dyn ListeningSource, now: OffsetDateTime) {
    core.refresh_requested = false;
    match pipeline::run(source, &core.pipeline_options(), now) {
        Ok(report) => core.apply_report(report),
        Err(err) => {
            error!(error = %err, "listening report failed");
            core.apply_failure(&err);
        }
    }
}

fn handle_mouse(core: &mut JourneyCore, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => core.select_next(),
        MouseEventKind::ScrollUp => core.select_prev(),
        _ => {}
    }
}

fn run_command(core: &mut JourneyCore, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        core.set_status("No command");
        return;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => core.set_status(
            "Commands: refresh | lookback <hours> | limit <1-50> | hours <from> <to> | genre <name> | all | search <text> | policy <fallback|skip|abort> | cache <on|off> | view <genres|hours|songs|breakdown> | theme | save",
        ),
        "refresh" => core.request_refresh(),
        "lookback" => match rest.parse::<u32>() {
            Ok(hours) if hours > 0 => {
                core.settings.lookback_hours = hours;
                info!(hours, "lookback window changed");
                core.request_refresh();
            }
            _ => core.set_status("Usage: lookback <hours>"),
        },
        "limit" => match rest.parse::<u8>() {
            Ok(limit) if (1..=crate::model::MAX_PAGE_LIMIT).contains(&limit) => {
                core.settings.page_limit = limit;
                core.request_refresh();
            }
            _ => core.set_status("Usage: limit <1-50>"),
        },
        "hours" => {
            let bounds: Vec<Option<u8>> = rest
                .split(|ch: char| ch.is_whitespace() || ch == '-')
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<u8>().ok().filter(|hour| *hour < 24))
                .collect();
            match bounds.as_slice() {
                [Some(from), Some(to)] => {
                    core.query.hours = crate::stats::HourRange::new(*from, *to);
                    core.shift_hours(0, 0);
                }
                _ => core.set_status("Usage: hours <from 0-23> <to 0-23>"),
            }
        }
        "genre" => {
            if rest.is_empty() {
                core.set_status("Usage: genre <name>");
            } else {
                core.only_genre(rest);
            }
        }
        "all" => core.select_all_genres(),
        "search" => core.set_search(rest),
        "policy" => match LookupFailurePolicy::parse(rest) {
            Some(policy) => {
                core.settings.lookup_failure = policy;
                core.request_refresh();
            }
            None => core.set_status("Usage: policy <fallback|skip|abort>"),
        },
        "cache" => match rest {
            "on" | "off" => {
                core.settings.cache_artist_genres = rest == "on";
                core.set_status(&format!("Artist genre cache {rest}"));
            }
            _ => core.set_status("Usage: cache <on|off>"),
        },
        "view" => {
            let view = match rest {
                "genres" => View::Genres,
                "hours" => View::Hours,
                "songs" => View::Songs,
                "breakdown" => View::Breakdown,
                _ => {
                    core.set_status("Usage: view <genres|hours|songs|breakdown>");
                    return;
                }
            };
            core.set_view(view);
        }
        "theme" => core.cycle_theme(),
        "save" => {
            if let Err(err) = core.save() {
                core.set_status(&format!("save error: {err:#}"));
            }
        }
        _ => core.set_status("Unknown command. Use :help"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{JourneyError, JourneyResult};
    use crate::fixture::FixtureSource;
    use crate::model::{PlayEvent, Settings};
    use std::collections::HashMap;
    use time::UtcOffset;
    use time::macros::datetime;

    fn idle_core() -> JourneyCore {
        let mut core = JourneyCore::new(Settings::default(), UtcOffset::UTC);
        core.refresh_requested = false;
        core
    }

    struct FailingSource;

    impl ListeningSource for FailingSource {
        fn recently_played(&self, _limit: u8) -> JourneyResult<Vec<PlayEvent>> {
            Err(JourneyError::upstream("recently played", "session is not authenticated"))
        }

        fn artist_genres(&self, _artist_id: &str) -> JourneyResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut core = idle_core();
        run_command(&mut core, "wat");
        assert!(core.status.contains("Unknown command"));
    }

    #[test]
    fn lookback_command_changes_settings_and_requests_refresh() {
        let mut core = idle_core();
        run_command(&mut core, "lookback 24");
        assert_eq!(core.settings.lookback_hours, 24);
        assert!(core.refresh_requested);

        let mut core = idle_core();
        run_command(&mut core, "lookback soon");
        assert_eq!(core.settings.lookback_hours, 72);
        assert!(!core.refresh_requested);
    }

    #[test]
    fn limit_command_rejects_values_above_page_maximum() {
        let mut core = idle_core();
        run_command(&mut core, "limit 51");
        assert_eq!(core.settings.page_limit, 50);
        assert!(core.status.starts_with("Usage"));
    }

    #[test]
    fn hours_command_accepts_dash_or_space() {
        let mut core = idle_core();
        run_command(&mut core, "hours 20-8");
        assert_eq!((core.query.hours.from(), core.query.hours.to()), (8, 20));

        run_command(&mut core, "hours 3 4");
        assert_eq!((core.query.hours.from(), core.query.hours.to()), (3, 4));

        run_command(&mut core, "hours 3 24");
        assert!(core.status.starts_with("Usage"));
    }

    #[test]
    fn policy_command_parses_policy() {
        let mut core = idle_core();
        run_command(&mut core, "policy skip");
        assert_eq!(core.settings.lookup_failure, LookupFailurePolicy::Skip);
    }

    #[test]
    fn refresh_loads_report_from_source() {
        let source = FixtureSource::new(
            vec![PlayEvent {
                track_id: String::from("t1"),
                track_name: String::from("Song"),
                artist_id: String::from("a1"),
                artist_name: String::from("Artist"),
                played_at: String::from("2024-05-04T10:00:00Z"),
            }],
            HashMap::from([(String::from("a1"), vec![String::from("house")])]),
        );
        let mut core = JourneyCore::new(Settings::default(), UtcOffset::UTC);
        refresh(&mut core, &source, datetime!(2024-05-04 12:00 UTC));

        assert!(!core.refresh_requested);
        assert_eq!(core.records().len(), 1);
        assert_eq!(core.visible_genres()[0].genre, "house");
    }

    #[test]
    fn refresh_failure_is_surfaced_without_partial_results() {
        let mut core = idle_core();
        refresh(&mut core, &FailingSource, datetime!(2024-05-04 12:00 UTC));
        assert!(core.report.is_none());
        assert!(core.status.contains("not authenticated"));
    }
}

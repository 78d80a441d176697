use crate::config;
use crate::error::JourneyError;
use crate::model::{GenreCount, HourCount, Settings, TrackRecord};
use crate::pipeline::{ListeningReport, PipelineOptions};
use crate::stats::{GenreSort, ReportQuery};
use time::UtcOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Genres,
    Hours,
    Songs,
    Breakdown,
}

impl View {
    pub fn label(self) -> &'static str {
        match self {
            Self::Genres => "Genres",
            Self::Hours => "Hours",
            Self::Songs => "Songs",
            Self::Breakdown => "Breakdown",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Genres => Self::Hours,
            Self::Hours => Self::Songs,
            Self::Songs => Self::Breakdown,
            Self::Breakdown => Self::Genres,
        }
    }

    pub const ALL: [View; 4] = [Self::Genres, Self::Hours, Self::Songs, Self::Breakdown];
}

#[derive(Debug)]
pub struct JourneyCore {
    pub settings: Settings,
    pub local_offset: UtcOffset,
    pub report: Option<ListeningReport>,
    pub query: ReportQuery,
    pub view: View,
    pub selected: usize,
    pub show_raw: bool,
    pub refresh_requested: bool,
    pub dirty: bool,
    pub status: String,
}

impl JourneyCore {
    pub fn new(settings: Settings, local_offset: UtcOffset) -> Self {
        Self {
            settings,
            local_offset,
            report: None,
            query: ReportQuery::default(),
            view: View::Genres,
            selected: 0,
            show_raw: false,
            refresh_requested: true,
            dirty: true,
            status: String::from("Ready"),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::from_settings(&self.settings, self.local_offset)
    }

    /// Replaces all derived data. Genre exclusions that no longer match any
    /// genre are dropped so a later run starts from a sane selection.
    pub fn apply_report(&mut self, report: ListeningReport) {
        self.query
            .excluded_genres
            .retain(|genre| report.genres.iter().any(|entry| &entry.genre == genre));
        let summary = format!(
            "Loaded {} plays, {} genres ({} fetched, {} malformed)",
            report.records.len(),
            report.genres.len(),
            report.fetched,
            report.malformed
        );
        self.report = Some(report);
        self.selected = 0;
        self.set_status(&summary);
    }

    /// A failed run leaves no partial results behind.
    pub fn apply_failure(&mut self, err: &JourneyError) {
        self.report = None;
        self.selected = 0;
        self.set_status(&format!("run failed: {err}"));
    }

    pub fn records(&self) -> &[TrackRecord] {
        self.report
            .as_ref()
            .map(|report| report.records.as_slice())
            .unwrap_or_default()
    }

    fn genre_table(&self) -> &[GenreCount] {
        self.report
            .as_ref()
            .map(|report| report.genres.as_slice())
            .unwrap_or_default()
    }

    fn hour_table(&self) -> &[HourCount] {
        self.report
            .as_ref()
            .map(|report| report.hours.as_slice())
            .unwrap_or_default()
    }

    /// Every genre of the run, selected or not, in the current sort order.
    pub fn genre_choices(&self) -> Vec<GenreCount> {
        let all = ReportQuery {
            sort: self.query.sort,
            ..ReportQuery::default()
        };
        all.genres(self.genre_table())
    }

    pub fn visible_genres(&self) -> Vec<GenreCount> {
        self.query.genres(self.genre_table())
    }

    pub fn visible_hours(&self) -> Vec<HourCount> {
        self.query.hours(self.hour_table())
    }

    pub fn visible_records(&self) -> Vec<&TrackRecord> {
        self.query.records(self.records(), self.local_offset)
    }

    fn list_len(&self) -> usize {
        match self.view {
            View::Genres | View::Breakdown => self.genre_choices().len(),
            View::Hours => self.visible_hours().len(),
            View::Songs => self.visible_records().len(),
        }
    }

    pub fn select_next(&mut self) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.dirty = true;
    }

    pub fn cycle_view(&mut self) {
        self.set_view(self.view.next());
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.selected = 0;
        self.dirty = true;
    }

    pub fn selected_genre(&self) -> Option<String> {
        if !matches!(self.view, View::Genres | View::Breakdown) {
            return None;
        }
        self.genre_choices()
            .into_iter()
            .nth(self.selected)
            .map(|entry| entry.genre)
    }

    pub fn toggle_selected_genre(&mut self) {
        let Some(genre) = self.selected_genre() else {
            self.set_status("Select a genre in the Genres view first");
            return;
        };
        self.query.toggle_genre(&genre);
        let state = if self.query.genre_selected(&genre) {
            "shown"
        } else {
            "hidden"
        };
        self.set_status(&format!("Genre {genre} {state}"));
    }

    pub fn only_genre(&mut self, genre: &str) {
        let table = self.genre_table().to_vec();
        if !table.iter().any(|entry| entry.genre == genre) {
            self.set_status(&format!("No genre named {genre}"));
            return;
        }
        self.query.select_only(genre, &table);
        self.set_status(&format!("Showing only {genre}"));
    }

    pub fn select_all_genres(&mut self) {
        self.query.select_all_genres();
        self.set_status("All genres shown");
    }

    pub fn shift_hours(&mut self, from_delta: i8, to_delta: i8) {
        let mut hours = self.query.hours;
        if from_delta != 0 {
            hours = hours.shift_from(from_delta);
        }
        if to_delta != 0 {
            hours = hours.shift_to(to_delta);
        }
        self.query.hours = hours;
        self.clamp_selection();
        self.set_status(&format!(
            "Hours {:02}-{:02}",
            self.query.hours.from(),
            self.query.hours.to()
        ));
    }

    pub fn cycle_sort(&mut self) {
        self.query.sort = self.query.sort.toggle();
        self.set_status(&format!("Genres sorted by {}", self.query.sort.label()));
    }

    pub fn sort(&self) -> GenreSort {
        self.query.sort
    }

    pub fn set_search(&mut self, search: &str) {
        self.query.search = search.trim().to_string();
        self.clamp_selection();
        if self.query.search.is_empty() {
            self.set_status("Search cleared");
        } else {
            self.set_status(&format!("Search: {}", self.query.search));
        }
    }

    pub fn toggle_raw(&mut self) {
        self.show_raw = !self.show_raw;
        let state = if self.show_raw { "on" } else { "off" };
        self.set_status(&format!("Raw data {state}"));
    }

    pub fn cycle_theme(&mut self) {
        self.settings.theme = self.settings.theme.next();
        self.set_status(&format!("Theme: {}", self.settings.theme.label()));
    }

    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
        self.set_status("Fetching recently played...");
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        config::save_settings(&self.settings)?;
        self.set_status("Settings saved");
        Ok(())
    }

    fn clamp_selection(&mut self) {
        let len = self.list_len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.dirty = true;
    }
}

use crate::filter::FilterCriteria;
use crate::map::{plan_pass, MapOverlay};
use crate::model::{AppEvent, ApplicationRecord, ApplicationStatus, LoadOutcome, ViewMode};
use crate::orchestrator::{process_load_completion, ExportTargets, UiCommand};
use crate::render::{navigate_url, render_list, ListRender, DISASTER_TYPES, NO_ADDRESS_FOR_NAVIGATION};
use crate::store::ApplicationStore;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use time::UtcOffset;

/// Text filters edited through the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Search,
    City,
    Township,
    Village,
}

impl FilterField {
    pub fn label(self) -> &'static str {
        match self {
            FilterField::Search => "Search",
            FilterField::City => "City",
            FilterField::Township => "Township",
            FilterField::Village => "Village",
        }
    }

    fn slot(self, c: &mut FilterCriteria) -> &mut String {
        match self {
            FilterField::Search => &mut c.search_term,
            FilterField::City => &mut c.city,
            FilterField::Township => &mut c.township,
            FilterField::Village => &mut c.village,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Editing(FilterField),
    Detail,
    Help,
}

pub struct UiState {
    pub app_name: String,
    pub store: ApplicationStore,
    pub criteria: FilterCriteria,
    pub filtered: Vec<ApplicationRecord>,
    pub render: ListRender,
    pub overlay: MapOverlay,
    pub offset: UtcOffset,
    pub mode: InputMode,
    pub input: String,
    pub selected: usize,
    pub scroll_offset: usize,
    pub detail_scroll: usize,
    pub loading: bool,
    pub info: String,
    pub export_targets: ExportTargets,
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn new(app_name: String, criteria: FilterCriteria, view: ViewMode, offset: UtcOffset) -> Self {
        let mut store = ApplicationStore::new();
        store.set_view_mode(view);
        Self {
            app_name,
            store,
            render: render_list(&[], offset),
            criteria,
            filtered: Vec::new(),
            overlay: MapOverlay::new(),
            offset,
            mode: InputMode::Browse,
            input: String::new(),
            selected: 0,
            scroll_offset: 0,
            detail_scroll: 0,
            loading: false,
            info: String::new(),
            export_targets: ExportTargets::default(),
            last_exported_path: None,
        }
    }

    pub fn view(&self) -> ViewMode {
        self.store.view_mode()
    }

    pub fn selected_record(&self) -> Option<&ApplicationRecord> {
        self.filtered.get(self.selected)
    }

    /// Re-run the filter over the store and rebuild the active view.
    ///
    /// In map mode this starts a new geocode pass; the returned command must be
    /// sent to the controller.
    pub fn refilter(&mut self) -> Option<UiCommand> {
        self.filtered = self.store.filtered(&self.criteria);
        self.render = render_list(&self.filtered, self.offset);
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
        match self.view() {
            ViewMode::Map => Some(self.start_map_pass()),
            ViewMode::List => None,
        }
    }

    fn start_map_pass(&mut self) -> UiCommand {
        let jobs = plan_pass(&self.filtered);
        let generation = self.overlay.begin_pass(jobs.len());
        UiCommand::Geocode { generation, jobs }
    }

    /// Switch between list and map. Entering the map always rebuilds the markers.
    pub fn set_view(&mut self, view: ViewMode) -> Option<UiCommand> {
        self.store.set_view_mode(view);
        match view {
            ViewMode::Map => Some(self.start_map_pass()),
            ViewMode::List => {
                self.overlay.reset();
                Some(UiCommand::CancelGeocode)
            }
        }
    }

    pub fn toggle_view(&mut self) -> Option<UiCommand> {
        self.set_view(self.view().toggled())
    }

    pub fn begin_edit(&mut self, field: FilterField) {
        self.input = field.slot(&mut self.criteria).clone();
        self.mode = InputMode::Editing(field);
    }

    /// Commit the input line into the field being edited.
    pub fn commit_edit(&mut self) -> Option<UiCommand> {
        let InputMode::Editing(field) = self.mode else {
            return None;
        };
        *field.slot(&mut self.criteria) = self.input.trim().to_string();
        self.mode = InputMode::Browse;
        self.input.clear();
        self.refilter()
    }

    pub fn cancel_edit(&mut self) {
        self.mode = InputMode::Browse;
        self.input.clear();
    }

    pub fn cycle_status(&mut self) -> Option<UiCommand> {
        let known = ApplicationStatus::KNOWN;
        let codes: Vec<&str> = known.iter().map(|s| s.as_str()).collect();
        self.criteria.status = next_option(&self.criteria.status, &codes);
        self.refilter()
    }

    pub fn cycle_disaster_type(&mut self) -> Option<UiCommand> {
        let codes: Vec<&str> = DISASTER_TYPES.iter().map(|(code, _)| *code).collect();
        self.criteria.disaster_type = next_option(&self.criteria.disaster_type, &codes);
        self.refilter()
    }

    pub fn clear_filters(&mut self) -> Option<UiCommand> {
        self.criteria.clear();
        self.info = "Filters cleared".into();
        self.refilter()
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll_offset {
                self.scroll_offset = self.selected;
            }
        }
    }

    pub fn select_next(&mut self, visible_rows: usize) {
        if self.selected + 1 < self.filtered.len() {
            self.selected += 1;
            let visible = visible_rows.max(1);
            if self.selected >= self.scroll_offset + visible {
                self.scroll_offset = self.selected + 1 - visible;
            }
        }
    }

    /// Navigation URL for the selected record, or the reason there is none.
    pub fn navigate_selected(&self) -> Result<String, String> {
        let Some(r) = self.selected_record() else {
            return Err("No application selected".into());
        };
        r.location()
            .and_then(navigate_url)
            .ok_or_else(|| NO_ADDRESS_FOR_NAVIGATION.to_string())
    }

    /// Apply a controller event. Returns a follow-up command when the view needs one.
    pub fn apply_event(&mut self, ev: AppEvent) -> Option<UiCommand> {
        match ev {
            AppEvent::LoadStarted => {
                self.loading = true;
                self.info = "Loading applications…".into();
                None
            }
            AppEvent::Loaded { result } => {
                self.loading = false;
                let outcome = self.store.apply_load(result);
                self.info = match &outcome {
                    LoadOutcome::Loaded { count } => format!("Loaded {count} application(s)"),
                    LoadOutcome::Failed { reason } => format!("載入案件失敗: {reason}"),
                };
                let cmd = self.refilter();
                let messages = process_load_completion(
                    &self.export_targets,
                    &self.criteria,
                    self.store.stats(),
                    &self.filtered,
                    &self.render,
                );
                if !messages.is_empty() {
                    self.info = format!("{} | {}", self.info, messages.join(" | "));
                }
                cmd
            }
            AppEvent::Geocoded(outcome) => {
                self.overlay.apply(outcome);
                None
            }
            AppEvent::GeocodePassFinished {
                generation,
                placed,
                failed,
            } => {
                if generation == self.overlay.generation() {
                    self.overlay.finish(generation);
                    self.info = format!("Map: {placed} marker(s) placed, {failed} failed");
                }
                None
            }
            AppEvent::Info(info) => {
                self.info = info.to_message();
                None
            }
        }
    }
}

/// Step through `""` followed by `options`, wrapping back to `""`.
fn next_option(current: &str, options: &[&str]) -> String {
    match options.iter().position(|o| *o == current) {
        None if current.is_empty() => options.first().copied().unwrap_or_default().to_string(),
        Some(i) if i + 1 < options.len() => options[i + 1].to_string(),
        _ => String::new(),
    }
}

pub fn push_wrapped_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, area_width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::{GeocodeOutcome, LatLng};

    fn rec(id: &str, status: &str, address: &str) -> ApplicationRecord {
        ApplicationRecord {
            id: id.into(),
            status: ApplicationStatus::parse(status),
            address: Some(address.into()),
            ..Default::default()
        }
    }

    fn loaded(state: &mut UiState, records: Vec<ApplicationRecord>) -> Option<UiCommand> {
        state.apply_event(AppEvent::Loaded {
            result: Ok::<_, FetchError>(records),
        })
    }

    fn state(view: ViewMode) -> UiState {
        UiState::new("test".into(), FilterCriteria::default(), view, UtcOffset::UTC)
    }

    #[test]
    fn load_in_list_mode_renders_rows_without_geocoding() {
        let mut s = state(ViewMode::List);
        let cmd = loaded(&mut s, vec![rec("1", "pending", "台北市"), rec("2", "approved", "高雄市")]);
        assert!(cmd.is_none());
        assert_eq!(s.render.len(), 2);
        assert_eq!(s.store.stats().total, 2);
        assert!(!s.loading);
    }

    #[test]
    fn load_in_map_mode_starts_a_pass_for_located_records() {
        let mut s = state(ViewMode::Map);
        let mut no_address = rec("3", "pending", "");
        no_address.address = None;
        let cmd = loaded(&mut s, vec![rec("1", "pending", "台北市"), no_address]);
        match cmd {
            Some(UiCommand::Geocode { generation, jobs }) => {
                assert_eq!(generation, s.overlay.generation());
                assert_eq!(jobs.len(), 1);
                assert_eq!(jobs[0].record_id, "1");
            }
            other => panic!("expected geocode command, got {other:?}"),
        }
    }

    #[test]
    fn refilter_supersedes_previous_pass() {
        let mut s = state(ViewMode::Map);
        loaded(&mut s, vec![rec("1", "pending", "台北市大安區")]);
        let old_gen = s.overlay.generation();

        s.criteria.city = "台北市".into();
        s.refilter();
        assert!(s.overlay.generation() > old_gen);

        let accepted = s.overlay.apply(GeocodeOutcome {
            generation: old_gen,
            job: plan_pass(&s.filtered)[0].clone(),
            result: Ok(LatLng { lat: 25.0, lng: 121.5 }),
        });
        assert!(!accepted);
        assert!(s.overlay.markers().is_empty());
    }

    #[test]
    fn leaving_map_clears_markers_and_cancels() {
        let mut s = state(ViewMode::Map);
        loaded(&mut s, vec![rec("1", "pending", "台北市")]);
        let job = plan_pass(&s.filtered)[0].clone();
        s.apply_event(AppEvent::Geocoded(GeocodeOutcome {
            generation: s.overlay.generation(),
            job,
            result: Ok(LatLng { lat: 25.0, lng: 121.5 }),
        }));
        assert_eq!(s.overlay.markers().len(), 1);

        let cmd = s.toggle_view();
        assert!(matches!(cmd, Some(UiCommand::CancelGeocode)));
        assert!(s.overlay.markers().is_empty());
        assert_eq!(s.view(), ViewMode::List);
    }

    #[test]
    fn failed_load_empties_list_and_reports() {
        let mut s = state(ViewMode::List);
        loaded(&mut s, vec![rec("1", "pending", "台北市")]);
        s.apply_event(AppEvent::Loaded {
            result: Err(FetchError::Status {
                url: "http://x/applications/".into(),
                status: 500,
            }),
        });
        assert!(s.filtered.is_empty());
        assert!(matches!(s.render, ListRender::Empty { .. }));
        assert!(s.info.starts_with("載入案件失敗"));
    }

    #[test]
    fn status_cycle_walks_known_codes_and_wraps() {
        let mut s = state(ViewMode::List);
        s.cycle_status();
        assert_eq!(s.criteria.status, "pending");
        s.cycle_status();
        assert_eq!(s.criteria.status, "under_review");
        for _ in 0..4 {
            s.cycle_status();
        }
        assert_eq!(s.criteria.status, "rejected");
        s.cycle_status();
        assert_eq!(s.criteria.status, "");
    }

    #[test]
    fn disaster_cycle_starts_at_flood() {
        let mut s = state(ViewMode::List);
        s.cycle_disaster_type();
        assert_eq!(s.criteria.disaster_type, "flood");
    }

    #[test]
    fn edit_commit_applies_trimmed_value() {
        let mut s = state(ViewMode::List);
        loaded(&mut s, vec![rec("1", "pending", "台北市"), rec("2", "pending", "高雄市")]);
        s.begin_edit(FilterField::City);
        s.input = " 高雄市 ".into();
        s.commit_edit();
        assert_eq!(s.criteria.city, "高雄市");
        assert_eq!(s.mode, InputMode::Browse);
        assert_eq!(s.filtered.len(), 1);
        assert_eq!(s.filtered[0].id, "2");
    }

    #[test]
    fn selection_is_clamped_after_refilter() {
        let mut s = state(ViewMode::List);
        loaded(&mut s, vec![rec("1", "pending", "台北市"), rec("2", "pending", "高雄市")]);
        s.select_next(10);
        assert_eq!(s.selected, 1);
        s.criteria.city = "台北市".into();
        s.refilter();
        assert_eq!(s.selected, 0);
    }

    #[test]
    fn navigate_without_location_reports_missing_address() {
        let mut s = state(ViewMode::List);
        let mut r = rec("1", "pending", "");
        r.address = None;
        loaded(&mut s, vec![r]);
        assert_eq!(s.navigate_selected(), Err(NO_ADDRESS_FOR_NAVIGATION.to_string()));
    }

    #[test]
    fn stale_pass_finished_does_not_touch_info() {
        let mut s = state(ViewMode::Map);
        loaded(&mut s, vec![rec("1", "pending", "台北市")]);
        let gen = s.overlay.generation();
        s.info.clear();
        s.apply_event(AppEvent::GeocodePassFinished {
            generation: gen - 1,
            placed: 3,
            failed: 0,
        });
        assert!(s.info.is_empty());
        assert!(!s.overlay.is_finished());
    }
}

//! Column explorer: the main multi-select view over the columns of the loaded table.
//!
//! Owns the canonical rows of the active task, the filter inputs, the selection
//! and the load gate. Every query the UI renders goes through [`ColumnExplorer::view`].

use crate::config::DEFAULT_MAX_SELECTED_COLUMNS;
use crate::error::{SelectionError, WorkflowFailure};
use crate::request::{RequestGate, RequestId, RequestTicket};
use crate::row::RowSet;
use crate::selection::SelectionStore;
use crate::time::{TimeRange, parse_timestamp};
use crate::view::{FilteredView, SortDirection, ViewParams, compute_view};
use crate::workflow::{ReportRequest, UploadResponse, WorkflowCall};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The remote engine's handle to the loaded table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub task_id: String,
    pub download_url: String,
    pub is_tmp: bool,
    pub origin_file: Option<String>,
    pub file_name: String,
    pub index_range: Vec<String>,
}

impl TaskInfo {
    pub fn from_upload(upload: &UploadResponse, fallback_name: &str) -> Self {
        Self {
            task_id: upload.task_id.clone(),
            download_url: upload.url.clone(),
            is_tmp: upload.is_tmp,
            origin_file: upload.origin_fn.clone(),
            file_name: upload
                .file_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| fallback_name.to_string()),
            index_range: upload.result.index_range.clone(),
        }
    }

    pub fn lower_limit(&self) -> Option<&str> {
        self.index_range.first().map(String::as_str)
    }

    pub fn upper_limit(&self) -> Option<&str> {
        self.index_range.get(1).or(self.index_range.last()).map(String::as_str)
    }

    /// Fresh uploads of files that are not yet in the library get saved automatically.
    pub fn needs_auto_save(&self) -> bool {
        self.origin_file.is_none() && !self.is_tmp
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Loading,
    Ready,
    Error(WorkflowFailure),
    Cancelled,
}

/// What the caller has to do after a table was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub columns: usize,
    pub duplicates: usize,
    pub pruned: usize,
    pub auto_save: Option<WorkflowCall>,
    pub replaced_task: Option<String>,
}

/// Text shown in the content area after a confirmed selection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationSummary {
    pub columns: Vec<String>,
    pub search: Option<String>,
    pub start_time: String,
    pub end_time: String,
}

impl ConfirmationSummary {
    pub fn filter_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(search) = &self.search {
            lines.push(format!("Keyword: {search}"));
        }
        if !self.start_time.is_empty() && !self.end_time.is_empty() {
            lines.push(format!("Time range: {} to {}", self.start_time, self.end_time));
        }
        lines
    }
}

/// Columns and time bounds after validation, shared by reports and model runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSelection {
    pub task_id: String,
    pub columns: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug)]
pub struct ColumnExplorer {
    state: LoadState,
    task: Option<TaskInfo>,
    rows: RowSet,
    view: FilteredView,
    search: String,
    start_input: String,
    end_input: String,
    time_range: Option<TimeRange>,
    sort: Option<SortDirection>,
    selection: SelectionStore,
    gate: RequestGate,
    max_selected: usize,
}

impl Default for ColumnExplorer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SELECTED_COLUMNS)
    }
}

impl ColumnExplorer {
    pub fn new(max_selected: usize) -> Self {
        Self {
            state: LoadState::Empty,
            task: None,
            rows: RowSet::default(),
            view: FilteredView::default(),
            search: String::new(),
            start_input: String::new(),
            end_input: String::new(),
            time_range: None,
            sort: None,
            selection: SelectionStore::new(),
            gate: RequestGate::new(),
            max_selected: max_selected.max(1),
        }
    }

    pub fn set_max_selected(&mut self, max_selected: usize) {
        self.max_selected = max_selected.max(1);
    }

    /// Starts an upload or library open. `None` while another load is in flight.
    pub fn begin_load(&mut self) -> Option<RequestTicket> {
        let ticket = self.gate.begin()?;
        self.state = LoadState::Loading;
        Some(ticket)
    }

    /// Applies a parsed table. Returns `None` for stale or cancelled responses.
    ///
    /// On failure the previous table stays loaded.
    pub fn table_loaded(
        &mut self,
        id: RequestId,
        result: Result<UploadResponse, WorkflowFailure>,
        fallback_name: &str,
    ) -> Option<Result<LoadReport, WorkflowFailure>> {
        if !self.gate.finish(id) {
            return None;
        }
        let upload = match result {
            Ok(upload) => upload,
            Err(failure) => {
                self.state = LoadState::Error(failure.clone());
                return Some(Err(failure));
            }
        };

        let task = TaskInfo::from_upload(&upload, fallback_name);
        let rows = RowSet::from_columns(&upload.result.columns, &upload.result.index_range);
        let pruned = self.selection.reconcile(&rows);
        let duplicates = rows.duplicates();
        let columns = rows.len();

        let replaced_task = self
            .task
            .as_ref()
            .map(|previous| previous.task_id.clone())
            .filter(|previous| *previous != task.task_id);
        let auto_save = task.needs_auto_save().then(|| WorkflowCall::SaveToLibrary {
            file_name: task.file_name.clone(),
            task_id: task.task_id.clone(),
        });

        self.rows = rows;
        self.task = Some(task);
        self.search.clear();
        self.start_input.clear();
        self.end_input.clear();
        self.time_range = None;
        self.refresh_view();
        self.state = LoadState::Ready;

        Some(Ok(LoadReport {
            columns,
            duplicates,
            pruned,
            auto_save,
            replaced_task,
        }))
    }

    /// Ends a load that produced no table (a library entry that is only a download link).
    pub fn release_load(&mut self, id: RequestId) -> bool {
        if !self.gate.finish(id) {
            return false;
        }
        self.state = if self.task.is_some() {
            LoadState::Ready
        } else {
            LoadState::Empty
        };
        true
    }

    pub fn cancel_load(&mut self) -> Option<RequestId> {
        let id = self.gate.cancel()?;
        self.state = LoadState::Cancelled;
        Some(id)
    }

    fn refresh_view(&mut self) {
        let params = ViewParams {
            search: self.search.clone(),
            time_range: self.time_range,
            sort: self.sort,
        };
        self.view = compute_view(&self.rows, &params);
    }

    pub fn set_search(&mut self, term: &str) -> bool {
        if self.search == term {
            return false;
        }
        self.search = term.to_string();
        self.refresh_view();
        true
    }

    pub fn set_start_input(&mut self, text: &str) {
        self.start_input = text.trim().to_string();
    }

    pub fn set_end_input(&mut self, text: &str) {
        self.end_input = text.trim().to_string();
    }

    fn parse_input(text: &str) -> Result<Option<NaiveDateTime>, SelectionError> {
        if text.is_empty() {
            return Ok(None);
        }
        parse_timestamp(text)
            .map(Some)
            .ok_or_else(|| SelectionError::UnparseableTime(text.to_string()))
    }

    /// Validated bounds as text, with unset inputs replaced by the table's index limits.
    fn resolve_bounds(&self) -> Result<(String, String), SelectionError> {
        let start = Self::parse_input(&self.start_input)?;
        let end = Self::parse_input(&self.end_input)?;
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(SelectionError::InvalidTimeRange);
            }
        }

        let limit = |input: &str, fallback: Option<&str>| {
            if input.is_empty() {
                fallback.unwrap_or_default().to_string()
            } else {
                input.to_string()
            }
        };
        let task = self.task.as_ref();
        Ok((
            limit(&self.start_input, task.and_then(TaskInfo::lower_limit)),
            limit(&self.end_input, task.and_then(TaskInfo::upper_limit)),
        ))
    }

    /// Filters the column list by the current start/end inputs.
    ///
    /// Both inputs empty removes the time filter.
    pub fn apply_time_filter(&mut self) -> Result<(), SelectionError> {
        if self.start_input.is_empty() && self.end_input.is_empty() {
            self.time_range = None;
            self.refresh_view();
            return Ok(());
        }
        let (start, end) = self.resolve_bounds()?;
        self.time_range = TimeRange::parse(Some(&start), Some(&end));
        self.refresh_view();
        Ok(())
    }

    /// Resets search and time filters. The selection is kept.
    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.start_input.clear();
        self.end_input.clear();
        self.time_range = None;
        self.refresh_view();
    }

    /// Unsorted goes ascending, then the direction flips on every call.
    pub fn toggle_sort(&mut self) -> SortDirection {
        let direction = self
            .sort
            .map(SortDirection::flipped)
            .unwrap_or(SortDirection::Ascending);
        self.sort = Some(direction);
        self.refresh_view();
        direction
    }

    pub fn toggle(&mut self, name: &str) -> bool {
        if !self.rows.contains(name) {
            return false;
        }
        self.selection.toggle(name)
    }

    /// Selects or deselects every row of the current view; hidden rows keep their state.
    pub fn select_all_visible(&mut self, selected: bool) -> usize {
        let names: Vec<&str> = self.view.names(&self.rows).collect();
        self.selection.set_many(names, selected)
    }

    pub fn all_visible_selected(&self) -> bool {
        !self.view.is_empty() && self.view.names(&self.rows).all(|name| self.selection.has(name))
    }

    /// Checks the selection and time bounds without changing anything.
    pub fn validate_selection(&self) -> Result<ValidatedSelection, SelectionError> {
        let task = self.task.as_ref().ok_or(SelectionError::NoActiveTask)?;
        let count = self.selection.count();
        if count == 0 {
            return Err(SelectionError::Empty);
        }
        if count > self.max_selected {
            return Err(SelectionError::TooMany {
                count,
                max: self.max_selected,
            });
        }
        let (start_time, end_time) = self.resolve_bounds()?;
        Ok(ValidatedSelection {
            task_id: task.task_id.clone(),
            columns: self.selection.snapshot(),
            start_time,
            end_time,
        })
    }

    pub fn confirm(&self) -> Result<(ReportRequest, ConfirmationSummary), SelectionError> {
        let selection = self.validate_selection()?;
        let search = self.search.trim();
        let summary = ConfirmationSummary {
            columns: selection.columns.clone(),
            search: (!search.is_empty()).then(|| search.to_string()),
            start_time: selection.start_time.clone(),
            end_time: selection.end_time.clone(),
        };
        let request = ReportRequest {
            task_id: selection.task_id,
            columns: selection.columns,
            start_time: selection.start_time,
            end_time: selection.end_time,
        };
        Ok((request, summary))
    }

    /// Files already in the library cannot be saved again.
    pub fn save_request(&self, save_name: Option<&str>) -> Result<WorkflowCall, SelectionError> {
        let task = self.task.as_ref().ok_or(SelectionError::NoActiveTask)?;
        if task.is_tmp {
            return Err(SelectionError::AlreadySaved);
        }
        let file_name = save_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(task.file_name.as_str())
            .to_string();
        Ok(WorkflowCall::SaveToLibrary {
            file_name,
            task_id: task.task_id.clone(),
        })
    }

    pub fn mark_saved(&mut self, task_id: &str) {
        if let Some(task) = self.task.as_mut().filter(|task| task.task_id == task_id) {
            task.is_tmp = true;
        }
    }

    pub fn selection_mut(&mut self) -> &mut SelectionStore {
        &mut self.selection
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn task(&self) -> Option<&TaskInfo> {
        self.task.as_ref()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn start_input(&self) -> &str {
        &self.start_input
    }

    pub fn end_input(&self) -> &str {
        &self.end_input
    }

    pub fn sort(&self) -> Option<SortDirection> {
        self.sort
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn max_selected(&self) -> usize {
        self.max_selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::TableMeta;

    fn upload(task_id: &str, columns: &[&str]) -> UploadResponse {
        UploadResponse {
            url: format!("https://files.example/{task_id}.csv"),
            task_id: task_id.to_string(),
            is_tmp: true,
            origin_fn: Some("origin.csv".into()),
            file_name: Some("table.csv".into()),
            result: TableMeta {
                columns: columns.iter().map(|name| name.to_string()).collect(),
                index_range: vec!["2024-01-01 00:00:00".into(), "2024-12-31 00:00:00".into()],
            },
        }
    }

    fn loaded(columns: &[&str]) -> ColumnExplorer {
        let mut explorer = ColumnExplorer::default();
        let ticket = explorer.begin_load().unwrap();
        explorer
            .table_loaded(ticket.id, Ok(upload("t1", columns)), "fallback.csv")
            .unwrap()
            .unwrap();
        explorer
    }

    fn visible(explorer: &ColumnExplorer) -> Vec<String> {
        explorer.view().names(explorer.rows()).map(str::to_string).collect()
    }

    #[test]
    fn selection_persists_across_search() {
        let mut explorer = loaded(&["temp_a", "temp_b", "pressure"]);
        explorer.toggle("pressure");

        explorer.set_search("temp");
        assert_eq!(visible(&explorer), ["temp_a", "temp_b"]);
        explorer.select_all_visible(true);

        explorer.clear_filters();
        assert_eq!(visible(&explorer).len(), 3);
        assert_eq!(explorer.selection().snapshot(), ["pressure", "temp_a", "temp_b"]);
    }

    #[test]
    fn deselect_all_visible_leaves_hidden_rows() {
        let mut explorer = loaded(&["a1", "a2", "b1"]);
        explorer.select_all_visible(true);
        explorer.set_search("a");
        assert!(explorer.all_visible_selected());

        explorer.select_all_visible(false);
        assert_eq!(explorer.selection().snapshot(), ["b1"]);
    }

    #[test]
    fn reload_prunes_missing_selection() {
        let mut explorer = loaded(&["keep", "drop"]);
        explorer.toggle("keep");
        explorer.toggle("drop");

        let ticket = explorer.begin_load().unwrap();
        let report = explorer
            .table_loaded(ticket.id, Ok(upload("t2", &["keep", "other"])), "x.csv")
            .unwrap()
            .unwrap();

        assert_eq!(report.pruned, 1);
        assert_eq!(report.replaced_task.as_deref(), Some("t1"));
        assert_eq!(explorer.selection().snapshot(), ["keep"]);
    }

    #[test]
    fn confirm_rejects_empty_and_oversized_selections() {
        let names: Vec<String> = (0..501).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut explorer = loaded(&refs);

        assert_eq!(explorer.confirm().unwrap_err(), SelectionError::Empty);

        explorer.select_all_visible(true);
        assert_eq!(
            explorer.confirm().unwrap_err(),
            SelectionError::TooMany { count: 501, max: 500 }
        );
        assert_eq!(explorer.selection().count(), 501);

        explorer.toggle("c0");
        assert_eq!(explorer.confirm().unwrap().0.columns.len(), 500);
    }

    #[test]
    fn confirm_rejects_end_not_after_start() {
        let mut explorer = loaded(&["a"]);
        explorer.toggle("a");
        explorer.set_start_input("2024-01-02");
        explorer.set_end_input("2024-01-01");
        assert_eq!(explorer.confirm().unwrap_err(), SelectionError::InvalidTimeRange);

        explorer.set_end_input("2024-01-02");
        assert_eq!(explorer.confirm().unwrap_err(), SelectionError::InvalidTimeRange);
    }

    #[test]
    fn unset_bounds_fall_back_to_index_limits() {
        let mut explorer = loaded(&["a", "b"]);
        explorer.toggle("b");
        explorer.set_search("b");
        explorer.set_start_input("2024-03-01");

        let (request, summary) = explorer.confirm().unwrap();

        assert_eq!(request.task_id, "t1");
        assert_eq!(request.columns, ["b"]);
        assert_eq!(request.start_time, "2024-03-01");
        assert_eq!(request.end_time, "2024-12-31 00:00:00");
        assert_eq!(summary.search.as_deref(), Some("b"));
        assert_eq!(summary.filter_lines().len(), 2);
    }

    #[test]
    fn unparseable_bound_is_reported() {
        let mut explorer = loaded(&["a"]);
        explorer.toggle("a");
        explorer.set_start_input("soon");
        assert_eq!(
            explorer.confirm().unwrap_err(),
            SelectionError::UnparseableTime("soon".into())
        );
        assert!(explorer.apply_time_filter().is_err());
    }

    #[test]
    fn sort_cycles_from_ascending() {
        let mut explorer = loaded(&["b", "c", "a"]);
        assert_eq!(explorer.toggle_sort(), SortDirection::Ascending);
        assert_eq!(visible(&explorer), ["a", "b", "c"]);
        assert_eq!(explorer.toggle_sort(), SortDirection::Descending);
        assert_eq!(visible(&explorer), ["c", "b", "a"]);
        assert_eq!(explorer.toggle_sort(), SortDirection::Ascending);
    }

    #[test]
    fn time_filter_uses_representative_time() {
        let mut explorer = loaded(&["a", "b"]);
        explorer.set_start_input("2024-06-01");
        explorer.apply_time_filter().unwrap();
        assert!(explorer.view().is_empty());

        explorer.set_start_input("2023-12-01");
        explorer.apply_time_filter().unwrap();
        assert_eq!(visible(&explorer), ["a", "b"]);
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let mut explorer = loaded(&["a"]);
        let ticket = explorer.begin_load().unwrap();
        let result = explorer.table_loaded(
            ticket.id,
            Err(WorkflowFailure::MalformedResponse("no columns".into())),
            "x.csv",
        );

        assert!(matches!(result, Some(Err(WorkflowFailure::MalformedResponse(_)))));
        assert_eq!(explorer.rows().len(), 1);
        assert!(!explorer.is_loading());
    }

    #[test]
    fn stale_and_cancelled_loads_are_ignored() {
        let mut explorer = ColumnExplorer::default();
        let ticket = explorer.begin_load().unwrap();
        assert!(explorer.begin_load().is_none());
        assert_eq!(explorer.cancel_load(), Some(ticket.id));

        assert!(explorer.table_loaded(ticket.id, Ok(upload("late", &["x"])), "x").is_none());
        assert_eq!(explorer.state(), &LoadState::Cancelled);
        assert!(explorer.task().is_none());
    }

    #[test]
    fn fresh_upload_schedules_auto_save() {
        let mut fresh = upload("t5", &["a"]);
        fresh.is_tmp = false;
        fresh.origin_fn = None;
        fresh.file_name = None;

        let mut explorer = ColumnExplorer::default();
        let ticket = explorer.begin_load().unwrap();
        let report = explorer.table_loaded(ticket.id, Ok(fresh), "mine.csv").unwrap().unwrap();

        assert_eq!(
            report.auto_save,
            Some(WorkflowCall::SaveToLibrary {
                file_name: "mine.csv".into(),
                task_id: "t5".into()
            })
        );
        explorer.mark_saved("t5");
        assert_eq!(explorer.save_request(None), Err(SelectionError::AlreadySaved));
    }

    #[test]
    fn download_only_load_keeps_current_table() {
        let mut explorer = loaded(&["a", "b"]);
        let ticket = explorer.begin_load().unwrap();

        assert!(explorer.release_load(ticket.id));
        assert_eq!(explorer.state(), &LoadState::Ready);
        assert_eq!(explorer.rows().len(), 2);
        assert!(!explorer.release_load(ticket.id));

        let mut empty = ColumnExplorer::default();
        let ticket = empty.begin_load().unwrap();
        assert!(empty.release_load(ticket.id));
        assert_eq!(empty.state(), &LoadState::Empty);
    }

    #[test]
    fn duplicates_are_counted_on_load() {
        let mut explorer = ColumnExplorer::default();
        let ticket = explorer.begin_load().unwrap();
        let report = explorer
            .table_loaded(ticket.id, Ok(upload("t1", &["a", "a", "b"])), "x")
            .unwrap()
            .unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.columns, 2);
    }
}

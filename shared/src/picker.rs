//! Single-select file picker over the stored-file library.

use crate::error::WorkflowFailure;
use crate::observable::{ListenerId, Observable};
use crate::pagination::{PaginationInfo, Paginator};
use crate::request::{RequestGate, RequestId, RequestTicket};
use crate::row::{Row, RowSet};
use crate::view::{FilteredView, ViewParams, compute_view};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Loading,
    Ready,
    Error(WorkflowFailure),
    Cancelled,
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

type ConfirmCallback = Box<dyn FnMut(&str) + Send>;

pub struct FilePicker {
    state: ModalState,
    rows: RowSet,
    view: FilteredView,
    search: String,
    paginator: Paginator,
    gate: RequestGate,
    highlighted: Option<String>,
    picked: Observable<Option<String>>,
    on_confirm: Option<ConfirmCallback>,
}

impl std::fmt::Debug for FilePicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePicker")
            .field("state", &self.state)
            .field("rows", &self.rows.len())
            .field("search", &self.search)
            .field("page", &self.paginator.info())
            .finish()
    }
}

impl FilePicker {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: ModalState::Closed,
            rows: RowSet::default(),
            view: FilteredView::default(),
            search: String::new(),
            paginator: Paginator::new(page_size),
            gate: RequestGate::new(),
            highlighted: None,
            picked: Observable::new(None),
            on_confirm: None,
        }
    }

    /// Called once per activation, with the activated name.
    pub fn on_confirm(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_confirm = Some(Box::new(callback));
    }

    /// Opens the modal and starts fetching the file list.
    ///
    /// Returns `None` when a fetch is already running; the modal is left as it is.
    pub fn open(&mut self) -> Option<RequestTicket> {
        let ticket = self.gate.begin()?;
        self.search.clear();
        self.paginator.reset();
        self.highlighted = None;
        self.picked.set(None);
        self.state = ModalState::Loading;
        Some(ticket)
    }

    /// Same as reopening, but only from a failed load. A cancelled listing is closed and reopened instead.
    pub fn retry(&mut self) -> Option<RequestTicket> {
        if !matches!(self.state, ModalState::Error(_)) {
            return None;
        }
        let ticket = self.gate.begin()?;
        self.state = ModalState::Loading;
        Some(ticket)
    }

    /// Applies a file-list response. Stale or unexpected responses are ignored.
    pub fn file_list_loaded(&mut self, id: RequestId, result: Result<Vec<Row>, WorkflowFailure>) -> bool {
        if !self.gate.finish(id) || self.state != ModalState::Loading {
            return false;
        }
        match result {
            Ok(rows) => {
                self.rows = RowSet::new(rows);
                self.refresh_view();
                self.state = ModalState::Ready;
            }
            // The previous list stays in place for a retry.
            Err(failure) => self.state = ModalState::Error(failure),
        }
        true
    }

    /// Abandons the running fetch. Returns its id so the backend can be told.
    pub fn cancel(&mut self) -> Option<RequestId> {
        let id = self.gate.cancel()?;
        if self.state.is_open() {
            self.state = ModalState::Cancelled;
        }
        Some(id)
    }

    pub fn set_search(&mut self, term: &str) {
        if self.search == term {
            return;
        }
        self.search = term.to_string();
        self.paginator.reset();
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.view = compute_view(&self.rows, &ViewParams::search(self.search.clone()));
        self.paginator.set_len(self.view.len());
    }

    pub fn next_page(&mut self) -> bool {
        self.paginator.next_page()
    }

    pub fn prev_page(&mut self) -> bool {
        self.paginator.prev_page()
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.paginator.go_to_page(page)
    }

    pub fn page_rows(&self) -> Vec<&Row> {
        self.paginator
            .page_items(&self.view)
            .iter()
            .filter_map(|index| self.rows.get(*index))
            .collect()
    }

    /// Single activation only marks the row.
    pub fn highlight(&mut self, name: &str) {
        if self.rows.contains(name) {
            self.highlighted = Some(name.to_string());
        }
    }

    /// Double activation picks the file, closes the modal and fires the confirm callback.
    pub fn activate(&mut self, name: &str) -> bool {
        if self.state != ModalState::Ready || !self.rows.contains(name) {
            return false;
        }
        self.state = ModalState::Closed;
        self.highlighted = None;
        self.picked.set(Some(name.to_string()));
        if let Some(callback) = self.on_confirm.as_mut() {
            callback(name);
        }
        true
    }

    /// Closes without picking. A running fetch is abandoned and its id returned.
    pub fn close(&mut self) -> Option<RequestId> {
        let abandoned = self.gate.cancel();
        self.state = ModalState::Closed;
        self.highlighted = None;
        abandoned
    }

    pub fn subscribe_picked(&mut self, listener: impl FnMut(&Option<String>) + Send + 'static) -> ListenerId {
        self.picked.subscribe(listener)
    }

    pub fn unsubscribe_picked(&mut self, id: ListenerId) -> bool {
        self.picked.unsubscribe(id)
    }

    pub fn picked(&self) -> Option<&str> {
        self.picked.get().as_deref()
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn pagination(&self) -> PaginationInfo {
        self.paginator.info()
    }

    pub fn page_size(&self) -> usize {
        self.paginator.page_size()
    }

    pub fn has_next(&self) -> bool {
        self.paginator.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.paginator.has_prev()
    }

    pub fn total_files(&self) -> usize {
        self.rows.len()
    }

    pub fn matching_files(&self) -> usize {
        self.view.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn files(names: &[&str]) -> Vec<Row> {
        names.iter().map(|name| Row::file(*name, "1KB", "2024-01-01")).collect()
    }

    fn page_names(picker: &FilePicker) -> Vec<String> {
        picker.page_rows().iter().map(|row| row.name.clone()).collect()
    }

    fn ready_picker(names: &[&str], page_size: usize) -> FilePicker {
        let mut picker = FilePicker::new(page_size);
        let ticket = picker.open().unwrap();
        assert!(picker.file_list_loaded(ticket.id, Ok(files(names))));
        picker
    }

    #[test]
    fn open_and_activate_fires_confirm_once() {
        let confirmed = Arc::new(Mutex::new(Vec::new()));
        let mut picker = ready_picker(&["A", "B", "C"], 2);
        picker.on_confirm({
            let confirmed = confirmed.clone();
            move |name| confirmed.lock().unwrap().push(name.to_string())
        });

        assert_eq!(picker.pagination(), PaginationInfo { current_page: 1, total_pages: 2 });
        assert_eq!(page_names(&picker), ["A", "B"]);
        assert!(picker.next_page());
        assert_eq!(page_names(&picker), ["C"]);

        assert!(picker.activate("C"));
        assert!(!picker.activate("C"));

        assert_eq!(*confirmed.lock().unwrap(), ["C"]);
        assert_eq!(picker.picked(), Some("C"));
        assert_eq!(picker.state(), &ModalState::Closed);
    }

    #[test]
    fn close_without_activation_confirms_nothing() {
        let calls = Arc::new(Mutex::new(0));
        let mut picker = ready_picker(&["A"], 10);
        picker.on_confirm({
            let calls = calls.clone();
            move |_| *calls.lock().unwrap() += 1
        });

        picker.highlight("A");
        picker.close();

        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(picker.picked(), None);
    }

    #[test]
    fn reopening_clears_previous_pick_and_search() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut picker = ready_picker(&["report.csv", "data.xlsx"], 10);
        picker.subscribe_picked({
            let seen = seen.clone();
            move |value| seen.lock().unwrap().push(value.clone())
        });

        picker.set_search("data");
        picker.activate("data.xlsx");
        picker.open().unwrap();

        assert_eq!(picker.search(), "");
        assert_eq!(picker.picked(), None);
        assert_eq!(*seen.lock().unwrap(), [Some("data.xlsx".to_string()), None]);
    }

    #[test]
    fn search_resets_page_and_filters() {
        let names: Vec<String> = (0..25).map(|i| format!("file_{i:02}.csv")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut picker = ready_picker(&refs, 10);

        picker.go_to_page(3);
        picker.set_search("FILE_1");

        assert_eq!(picker.pagination().current_page, 1);
        assert_eq!(picker.matching_files(), 10);
        assert_eq!(picker.total_files(), 25);
    }

    #[test]
    fn second_open_while_loading_is_ignored() {
        let mut picker = FilePicker::new(10);
        let first = picker.open().unwrap();
        assert!(picker.open().is_none());
        assert!(picker.file_list_loaded(first.id, Ok(files(&["x"]))));
        assert_eq!(picker.state(), &ModalState::Ready);
    }

    #[test]
    fn failed_load_can_be_retried() {
        let mut picker = FilePicker::new(10);
        let ticket = picker.open().unwrap();
        picker.file_list_loaded(ticket.id, Err(WorkflowFailure::Network("refused".into())));
        assert!(matches!(picker.state(), ModalState::Error(_)));

        let retry = picker.retry().unwrap();
        assert_eq!(picker.state(), &ModalState::Loading);
        assert!(picker.file_list_loaded(retry.id, Ok(files(&["a"]))));
        assert_eq!(page_names(&picker), ["a"]);
    }

    #[test]
    fn cancelled_load_ignores_late_response() {
        let mut picker = FilePicker::new(10);
        let ticket = picker.open().unwrap();

        assert_eq!(picker.cancel(), Some(ticket.id));
        assert_eq!(picker.state(), &ModalState::Cancelled);
        assert!(!picker.file_list_loaded(ticket.id, Ok(files(&["late"]))));
        assert_eq!(picker.total_files(), 0);
    }

    #[test]
    fn cancelled_load_is_not_retried() {
        let mut picker = FilePicker::new(10);
        picker.open().unwrap();
        picker.cancel().unwrap();

        assert!(picker.retry().is_none());
        assert_eq!(picker.state(), &ModalState::Cancelled);

        picker.close();
        assert!(picker.open().is_some());
        assert_eq!(picker.state(), &ModalState::Loading);
    }

    #[test]
    fn activate_unknown_name_does_nothing() {
        let mut picker = ready_picker(&["A"], 10);
        assert!(!picker.activate("missing"));
        assert_eq!(picker.state(), &ModalState::Ready);
    }
}

//! Column explorer domain.
//!
//! One actor owns the [`ColumnExplorer`], the [`VirtualWindow`] and the
//! [`ModelPicker`]. Views send intent through the relays and read the published
//! [`ColumnsSnapshot`], the selected count and the row pool.

use crate::connection::{Outgoing, Reply};
use crate::dataflow::{Actor, Relay, relay};
use crate::error_display::{ErrorAlert, log_error_console_only};
use crate::virtual_list::{PoolSink, PoolSlot};
use futures::stream::{self, BoxStream, StreamExt};
use shared::explorer::{ColumnExplorer, ConfirmationSummary, LoadReport, LoadState};
use shared::models::ModelPicker;
use shared::request::{RequestGate, RequestId};
use shared::view::SortDirection;
use shared::viewport::{RenderedRow, RowSink, VirtualWindow};
use shared::{ClientConfig, RunMode, SelectionError, UiSection, WorkflowCall, WorkflowFailure, WorkflowOutcome};
use std::collections::HashMap;
use zoon::{Mutable, MutableVec, ReadOnlyMutable};

/// A table file read in the browser, ready for upload.
#[derive(Debug, Clone)]
pub struct PickedUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ColumnsEvent {
    UploadSelected(PickedUpload),
    LibraryFilePicked(String),
    SearchChanged(String),
    StartTimeChanged(String),
    EndTimeChanged(String),
    ApplyTimeFilter,
    ClearFilters,
    SortClicked,
    RowToggled(String),
    SelectAllClicked,
    ConfirmClicked,
    SaveClicked,
    CancelClicked,
    RetryClicked,
    ModelSearchChanged(String),
    ModelSelected(String),
    ModelParameterChanged(String, String),
    ModelRunClicked(RunMode),
    ListScrolled(f64),
    ViewportMeasured(f64),
    ConfigLoaded(ClientConfig),
    ReplyReceived(RequestId, Reply),
}

impl ColumnsEvent {
    /// Scrolling only moves the row pool; the published snapshot stays as it is.
    pub fn changes_snapshot(&self) -> bool {
        !matches!(self, Self::ListScrolled(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CallKind {
    Load { fallback_name: String },
    Report,
    Model(RunMode),
    Save { task_id: String, automatic: bool },
    DropTask,
}

/// Background calls are not kept; their failures are only logged.
#[derive(Debug)]
struct PendingCall {
    kind: CallKind,
    call: Option<WorkflowCall>,
}

/// The last load or action that failed transiently, re-sent as is on retry.
#[derive(Debug)]
struct FailedCall {
    call: WorkflowCall,
    kind: CallKind,
    failure: WorkflowFailure,
}

/// Result of the last report or model run, shown under the summary.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Report { url: String },
    ModelPreview { url: String },
    ModelSubmitted { output: String },
    LibraryDownload { file_name: String, url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryOffer {
    pub label: &'static str,
    pub failure: WorkflowFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterField {
    pub key: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPanel {
    pub search: String,
    pub models: Vec<String>,
    pub selected: Option<String>,
    pub description: String,
    pub parameters: Vec<ParameterField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsSnapshot {
    pub load: LoadState,
    pub busy: Option<&'static str>,
    pub file_name: Option<String>,
    pub download_url: Option<String>,
    pub saved: bool,
    pub total_rows: usize,
    pub matching_rows: usize,
    pub search: String,
    pub start_input: String,
    pub end_input: String,
    pub lower_limit: String,
    pub upper_limit: String,
    pub sort: Option<SortDirection>,
    pub all_visible_selected: bool,
    pub max_selected: usize,
    pub item_height: f64,
    pub content_height: f64,
    pub scroll_generation: u64,
    pub search_debounce_ms: u32,
    pub summary: Option<ConfirmationSummary>,
    pub result: Option<ActionResult>,
    pub retry: Option<RetryOffer>,
    pub models: ModelPanel,
}

impl Default for ColumnsSnapshot {
    fn default() -> Self {
        let ui = UiSection::default();
        Self {
            load: LoadState::Empty,
            busy: None,
            file_name: None,
            download_url: None,
            saved: false,
            total_rows: 0,
            matching_rows: 0,
            search: String::new(),
            start_input: String::new(),
            end_input: String::new(),
            lower_limit: String::new(),
            upper_limit: String::new(),
            sort: None,
            all_visible_selected: false,
            max_selected: ui.max_selected_columns,
            item_height: ui.item_height,
            content_height: 0.0,
            scroll_generation: 0,
            search_debounce_ms: ui.search_debounce_ms,
            summary: None,
            result: None,
            retry: None,
            models: ModelPanel::default(),
        }
    }
}

/// Everything the column actor owns.
pub struct ColumnsState {
    explorer: ColumnExplorer,
    window: VirtualWindow,
    measured: bool,
    viewport_height: f64,
    all_visible_selected: bool,
    models: ModelPicker,
    actions: RequestGate,
    action_label: Option<&'static str>,
    pending: HashMap<RequestId, PendingCall>,
    failed: Option<FailedCall>,
    summary: Option<ConfirmationSummary>,
    result: Option<ActionResult>,
    scroll_generation: u64,
    search_debounce_ms: u32,
    sink: PoolSink,
    outbox: Relay<Outgoing>,
    toasts: Relay<ErrorAlert>,
}

impl ColumnsState {
    pub fn new(
        ui: &UiSection,
        pool: MutableVec<PoolSlot>,
        selected_count: Mutable<usize>,
        outbox: Relay<Outgoing>,
        toasts: Relay<ErrorAlert>,
    ) -> Self {
        let mut explorer = ColumnExplorer::new(ui.max_selected_columns);
        explorer
            .selection_mut()
            .subscribe(move |selected| selected_count.set_neq(selected.len()));
        let window = VirtualWindow::or_default_height(ui.item_height, ui.overscan);

        let mut state = Self {
            explorer,
            window,
            measured: false,
            viewport_height: ui.viewport_height,
            all_visible_selected: false,
            models: ModelPicker::default(),
            actions: RequestGate::new(),
            action_label: None,
            pending: HashMap::new(),
            failed: None,
            summary: None,
            result: None,
            scroll_generation: 0,
            search_debounce_ms: ui.search_debounce_ms,
            sink: PoolSink::new(pool),
            outbox,
            toasts,
        };
        state.measure();
        state
    }

    pub fn handle(&mut self, event: ColumnsEvent) {
        match event {
            ColumnsEvent::UploadSelected(upload) => {
                let fallback_name = upload.file_name.clone();
                self.start_load(
                    WorkflowCall::UploadTable {
                        file_name: upload.file_name,
                        bytes: upload.bytes,
                    },
                    fallback_name,
                );
            }
            ColumnsEvent::LibraryFilePicked(file_name) => {
                self.start_load(
                    WorkflowCall::OpenFromLibrary {
                        file_name: file_name.clone(),
                    },
                    file_name,
                );
            }
            ColumnsEvent::SearchChanged(term) => {
                if self.explorer.set_search(&term) {
                    self.reset_window();
                }
            }
            ColumnsEvent::StartTimeChanged(text) => self.explorer.set_start_input(&text),
            ColumnsEvent::EndTimeChanged(text) => self.explorer.set_end_input(&text),
            ColumnsEvent::ApplyTimeFilter => match self.explorer.apply_time_filter() {
                Ok(()) => self.reset_window(),
                Err(error) => self.reject(&error),
            },
            ColumnsEvent::ClearFilters => {
                self.explorer.clear_filters();
                self.reset_window();
            }
            ColumnsEvent::SortClicked => {
                self.explorer.toggle_sort();
                self.reset_window();
            }
            ColumnsEvent::RowToggled(name) => {
                if self.explorer.toggle(&name) {
                    self.refresh_selection();
                }
            }
            ColumnsEvent::SelectAllClicked => {
                let select = !self.all_visible_selected;
                if self.explorer.select_all_visible(select) > 0 {
                    self.refresh_selection();
                }
            }
            ColumnsEvent::ConfirmClicked => match self.explorer.confirm() {
                Ok((request, summary)) => {
                    if self.start_action(WorkflowCall::RenderReport(request), CallKind::Report) {
                        self.summary = Some(summary);
                        self.result = None;
                    }
                }
                Err(error) => self.reject(&error),
            },
            ColumnsEvent::SaveClicked => match self.explorer.save_request(None) {
                Ok(call) => {
                    if let WorkflowCall::SaveToLibrary { task_id, .. } = &call {
                        let kind = CallKind::Save {
                            task_id: task_id.clone(),
                            automatic: false,
                        };
                        self.start_action(call, kind);
                    }
                }
                Err(error) => self.reject(&error),
            },
            ColumnsEvent::CancelClicked => self.cancel(),
            ColumnsEvent::RetryClicked => self.retry(),
            ColumnsEvent::ModelSearchChanged(term) => self.models.set_search(&term),
            ColumnsEvent::ModelSelected(name) => {
                self.models.select(&name);
            }
            ColumnsEvent::ModelParameterChanged(key, value) => {
                self.models.set_parameter(&key, &value);
            }
            ColumnsEvent::ModelRunClicked(mode) => {
                let request = match mode {
                    RunMode::Preview => self.models.preview(&self.explorer),
                    RunMode::Submit => self.models.submit(&self.explorer),
                };
                match request {
                    Ok(request) => {
                        if self.start_action(WorkflowCall::RunModel(request), CallKind::Model(mode)) {
                            self.result = None;
                        }
                    }
                    Err(error) => self.reject(&error),
                }
            }
            ColumnsEvent::ListScrolled(scroll_top) => {
                if self.window.scroll_to(scroll_top).is_some() {
                    self.render();
                }
            }
            ColumnsEvent::ViewportMeasured(height) => {
                if height != self.viewport_height {
                    self.viewport_height = height;
                    self.measure();
                }
            }
            ColumnsEvent::ConfigLoaded(config) => self.apply_config(config),
            ColumnsEvent::ReplyReceived(request, reply) => self.reply_received(request, reply),
        }
    }

    fn apply_config(&mut self, config: ClientConfig) {
        self.explorer.set_max_selected(config.ui.max_selected_columns);
        self.search_debounce_ms = config.ui.search_debounce_ms;
        match VirtualWindow::with_overscan(config.ui.item_height, config.ui.overscan) {
            Ok(window) => {
                self.window = window;
                self.window.set_total(self.explorer.view().len());
                self.scroll_generation += 1;
                self.measure();
            }
            Err(error) => log_error_console_only(ErrorAlert::new_info("Config", error.to_string())),
        }
        self.models.set_catalog(config.models);
    }

    fn reject(&self, error: &SelectionError) {
        self.toasts.send(ErrorAlert::new_selection_error(error));
    }

    fn start_load(&mut self, call: WorkflowCall, fallback_name: String) {
        let Some(ticket) = self.explorer.begin_load() else {
            self.toasts
                .send(ErrorAlert::new_info("Please Wait", "A table is already loading."));
            return;
        };
        self.send_kept(ticket.id, call, CallKind::Load { fallback_name });
    }

    /// Report, model run or manual save. Returns `false` when another one is running.
    fn start_action(&mut self, call: WorkflowCall, kind: CallKind) -> bool {
        let Some(ticket) = self.actions.begin() else {
            self.toasts
                .send(ErrorAlert::new_info("Please Wait", "Another request is still running."));
            return false;
        };
        self.action_label = Some(call.label());
        self.send_kept(ticket.id, call, kind);
        true
    }

    /// Sends a gated call and keeps a copy of it for a later retry.
    fn send_kept(&mut self, request: RequestId, call: WorkflowCall, kind: CallKind) {
        self.failed = None;
        self.pending.insert(
            request,
            PendingCall {
                kind,
                call: Some(call.clone()),
            },
        );
        self.outbox.send(Outgoing::Run { request, call });
    }

    fn retry(&mut self) {
        let busy = match &self.failed {
            None => return,
            Some(FailedCall { kind: CallKind::Load { .. }, .. }) => self.explorer.is_loading(),
            Some(_) => self.actions.is_busy(),
        };
        if busy {
            self.toasts
                .send(ErrorAlert::new_info("Please Wait", "Another request is still running."));
            return;
        }
        let Some(FailedCall { call, kind, .. }) = self.failed.take() else {
            return;
        };
        match kind {
            CallKind::Load { fallback_name } => self.start_load(call, fallback_name),
            kind => {
                self.start_action(call, kind);
            }
        }
    }

    fn keep_failed(&mut self, call: Option<WorkflowCall>, kind: CallKind, failure: &WorkflowFailure) {
        if let Some(call) = call.filter(|_| failure.is_transient()) {
            self.failed = Some(FailedCall {
                call,
                kind,
                failure: failure.clone(),
            });
        }
    }

    /// Auto-save and task cleanup run outside the gates; nobody waits for them.
    fn start_background(&mut self, call: WorkflowCall, kind: CallKind) {
        let request = RequestId::next();
        self.pending.insert(request, PendingCall { kind, call: None });
        self.outbox.send(Outgoing::Run { request, call });
    }

    fn cancel(&mut self) {
        let cancelled = [self.explorer.cancel_load(), self.actions.cancel()];
        for request in cancelled.into_iter().flatten() {
            self.pending.remove(&request);
            self.outbox.send(Outgoing::Cancel { request });
        }
        self.action_label = None;
    }

    fn reply_received(&mut self, request: RequestId, reply: Reply) {
        let Some(PendingCall { kind, call }) = self.pending.remove(&request) else {
            return;
        };
        match kind {
            CallKind::Load { fallback_name } => self.load_replied(request, reply, fallback_name, call),
            CallKind::Save { task_id, automatic: true } => match reply.into_outcome() {
                Ok(Some(WorkflowOutcome::Saved { file_name })) => {
                    self.explorer.mark_saved(&task_id);
                    self.toasts.send(ErrorAlert::new_info("Saved to Library", file_name));
                }
                Ok(_) => {}
                Err(failure) => {
                    log_error_console_only(ErrorAlert::new_workflow_failure("Automatic save", &failure))
                }
            },
            CallKind::DropTask => {
                if let Err(failure) = reply.into_outcome() {
                    log_error_console_only(ErrorAlert::new_workflow_failure("Releasing previous table", &failure));
                }
            }
            kind => self.action_replied(request, reply, kind, call),
        }
    }

    fn load_replied(&mut self, request: RequestId, reply: Reply, fallback_name: String, call: Option<WorkflowCall>) {
        let result = match reply.into_outcome() {
            Ok(Some(WorkflowOutcome::TableLoaded(upload))) => Ok(upload),
            Ok(Some(WorkflowOutcome::Download { url })) => {
                if self.explorer.release_load(request) {
                    self.result = Some(ActionResult::LibraryDownload {
                        file_name: fallback_name,
                        url,
                    });
                }
                return;
            }
            Ok(Some(other)) => Err(unexpected(&other)),
            Ok(None) => {
                self.explorer.cancel_load();
                return;
            }
            Err(failure) => Err(failure),
        };
        match self.explorer.table_loaded(request, result, &fallback_name) {
            None => {}
            Some(Ok(report)) => self.table_applied(report),
            Some(Err(failure)) => {
                self.toasts
                    .send(ErrorAlert::new_workflow_failure("Loading table", &failure));
                self.keep_failed(call, CallKind::Load { fallback_name }, &failure);
            }
        }
    }

    fn table_applied(&mut self, report: LoadReport) {
        let mut message = format!("{} columns", report.columns);
        if report.duplicates > 0 {
            message.push_str(&format!(", {} duplicate names skipped", report.duplicates));
        }
        if report.pruned > 0 {
            message.push_str(&format!(", {} selected columns no longer exist", report.pruned));
        }
        let file_name = self
            .explorer
            .task()
            .map(|task| task.file_name.clone())
            .unwrap_or_default();
        self.toasts.send(ErrorAlert::new_success(format!("Loaded {file_name}"), message));

        if let Some(call) = report.auto_save {
            if let WorkflowCall::SaveToLibrary { task_id, .. } = &call {
                let kind = CallKind::Save {
                    task_id: task_id.clone(),
                    automatic: true,
                };
                self.start_background(call, kind);
            }
        }
        if let Some(task_id) = report.replaced_task {
            self.start_background(WorkflowCall::DropTask { task_id }, CallKind::DropTask);
        }
        self.summary = None;
        self.result = None;
        self.reset_window();
    }

    fn action_replied(&mut self, request: RequestId, reply: Reply, kind: CallKind, call: Option<WorkflowCall>) {
        if !self.actions.finish(request) {
            return;
        }
        self.action_label = None;
        let outcome = match reply.into_outcome() {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return,
            Err(failure) => {
                let action = match kind {
                    CallKind::Report => "Report",
                    CallKind::Model(_) => "Model run",
                    _ => "Save",
                };
                self.toasts.send(ErrorAlert::new_workflow_failure(action, &failure));
                self.keep_failed(call, kind, &failure);
                return;
            }
        };
        match (kind, outcome) {
            (CallKind::Report, WorkflowOutcome::Report { url }) => {
                self.result = Some(ActionResult::Report { url });
            }
            (CallKind::Model(RunMode::Preview), WorkflowOutcome::ModelPreview { url }) => {
                self.result = Some(ActionResult::ModelPreview { url });
            }
            (CallKind::Model(RunMode::Submit), WorkflowOutcome::ModelSubmitted { output }) => {
                self.result = Some(ActionResult::ModelSubmitted { output });
            }
            (CallKind::Save { task_id, .. }, WorkflowOutcome::Saved { file_name }) => {
                self.explorer.mark_saved(&task_id);
                self.toasts.send(ErrorAlert::new_success("Saved to Library", file_name));
            }
            (_, other) => self
                .toasts
                .send(ErrorAlert::new_workflow_failure("Request", &unexpected(&other))),
        }
    }

    fn measure(&mut self) {
        self.measured = self.window.initialize(self.viewport_height).is_ok();
        self.render();
    }

    fn reset_window(&mut self) {
        self.window.set_total(self.explorer.view().len());
        self.scroll_generation += 1;
        self.all_visible_selected = self.explorer.all_visible_selected();
        self.render();
    }

    fn render(&mut self) {
        if self.measured {
            self.window.render(
                self.explorer.rows(),
                self.explorer.view(),
                self.explorer.selection(),
                &mut self.sink,
            );
        } else {
            self.render_full_list();
        }
    }

    /// Used when the viewport cannot be measured: every row of the view is rendered.
    fn render_full_list(&mut self) {
        self.sink.clear();
        let rows = self.explorer.rows();
        let selection = self.explorer.selection();
        for (position, index) in self.explorer.view().indices().iter().copied().enumerate() {
            if let Some(row) = rows.get(index) {
                self.sink.row(RenderedRow {
                    position,
                    index,
                    name: &row.name,
                    time: row.time.as_deref(),
                    checked: selection.has(&row.name),
                    offset: self.window.item_offset(position),
                });
            }
        }
    }

    fn refresh_selection(&mut self) {
        self.all_visible_selected = self.explorer.all_visible_selected();
        if self.measured {
            self.window.refresh_selection(
                self.explorer.rows(),
                self.explorer.view(),
                self.explorer.selection(),
                &mut self.sink,
            );
        } else {
            self.render_full_list();
        }
    }

    pub fn snapshot(&self) -> ColumnsSnapshot {
        let task = self.explorer.task();
        let models = ModelPanel {
            search: self.models.search().to_string(),
            models: self
                .models
                .visible_models()
                .into_iter()
                .map(|model| model.name.clone())
                .collect(),
            selected: self.models.selected_model().map(|model| model.name.clone()),
            description: self
                .models
                .selected_model()
                .map(|model| model.description.clone())
                .unwrap_or_default(),
            parameters: self
                .models
                .selected_model()
                .map(|model| {
                    self.models
                        .parameters()
                        .iter()
                        .map(|(key, value)| ParameterField {
                            key: key.clone(),
                            value: value.clone(),
                            description: model
                                .parameters
                                .get(key)
                                .map(|parameter| parameter.description.clone())
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        };
        ColumnsSnapshot {
            load: self.explorer.state().clone(),
            busy: if self.explorer.is_loading() {
                Some("load table")
            } else {
                self.action_label
            },
            file_name: task.map(|task| task.file_name.clone()),
            download_url: task
                .map(|task| task.download_url.clone())
                .filter(|url| !url.is_empty()),
            saved: task.is_some_and(|task| task.is_tmp),
            total_rows: self.explorer.rows().len(),
            matching_rows: self.explorer.view().len(),
            search: self.explorer.search().to_string(),
            start_input: self.explorer.start_input().to_string(),
            end_input: self.explorer.end_input().to_string(),
            lower_limit: task.and_then(|task| task.lower_limit()).unwrap_or_default().to_string(),
            upper_limit: task.and_then(|task| task.upper_limit()).unwrap_or_default().to_string(),
            sort: self.explorer.sort(),
            all_visible_selected: self.all_visible_selected,
            max_selected: self.explorer.max_selected(),
            item_height: self.window.item_height(),
            content_height: self.window.content_height(),
            scroll_generation: self.scroll_generation,
            search_debounce_ms: self.search_debounce_ms,
            summary: self.summary.clone(),
            result: self.result.clone(),
            retry: self.failed.as_ref().map(|failed| RetryOffer {
                label: failed.call.label(),
                failure: failed.failure.clone(),
            }),
            models,
        }
    }
}

fn unexpected(outcome: &WorkflowOutcome) -> WorkflowFailure {
    WorkflowFailure::MalformedResponse(format!("unexpected reply {outcome:?}"))
}

#[derive(Clone)]
pub struct ColumnsDomain {
    pub snapshot: Actor<ColumnsSnapshot>,
    pub selected_count: ReadOnlyMutable<usize>,
    pub pool: MutableVec<PoolSlot>,

    pub upload_selected_relay: Relay<PickedUpload>,
    pub library_file_picked_relay: Relay<String>,
    pub search_changed_relay: Relay<String>,
    pub start_time_changed_relay: Relay<String>,
    pub end_time_changed_relay: Relay<String>,
    pub apply_time_filter_clicked_relay: Relay<()>,
    pub clear_filters_clicked_relay: Relay<()>,
    pub sort_clicked_relay: Relay<()>,
    pub row_toggled_relay: Relay<String>,
    pub select_all_clicked_relay: Relay<()>,
    pub confirm_clicked_relay: Relay<()>,
    pub save_clicked_relay: Relay<()>,
    pub cancel_clicked_relay: Relay<()>,
    pub retry_clicked_relay: Relay<()>,
    pub model_search_changed_relay: Relay<String>,
    pub model_selected_relay: Relay<String>,
    pub model_parameter_changed_relay: Relay<(String, String)>,
    pub model_run_clicked_relay: Relay<RunMode>,
    pub list_scrolled_relay: Relay<f64>,
    pub viewport_measured_relay: Relay<f64>,
    pub config_loaded_relay: Relay<ClientConfig>,
    pub reply_received_relay: Relay<(RequestId, Reply)>,
}

impl ColumnsDomain {
    pub fn new(outbox: Relay<Outgoing>, toasts: Relay<ErrorAlert>) -> Self {
        let (upload_selected_relay, upload_selected_stream) = relay();
        let (library_file_picked_relay, library_file_picked_stream) = relay();
        let (search_changed_relay, search_changed_stream) = relay();
        let (start_time_changed_relay, start_time_changed_stream) = relay();
        let (end_time_changed_relay, end_time_changed_stream) = relay();
        let (apply_time_filter_clicked_relay, apply_time_filter_clicked_stream) = relay();
        let (clear_filters_clicked_relay, clear_filters_clicked_stream) = relay();
        let (sort_clicked_relay, sort_clicked_stream) = relay();
        let (row_toggled_relay, row_toggled_stream) = relay();
        let (select_all_clicked_relay, select_all_clicked_stream) = relay();
        let (confirm_clicked_relay, confirm_clicked_stream) = relay();
        let (save_clicked_relay, save_clicked_stream) = relay();
        let (cancel_clicked_relay, cancel_clicked_stream) = relay();
        let (retry_clicked_relay, retry_clicked_stream) = relay();
        let (model_search_changed_relay, model_search_changed_stream) = relay();
        let (model_selected_relay, model_selected_stream) = relay();
        let (model_parameter_changed_relay, model_parameter_changed_stream) = relay();
        let (model_run_clicked_relay, model_run_clicked_stream) = relay();
        let (list_scrolled_relay, list_scrolled_stream) = relay();
        let (viewport_measured_relay, viewport_measured_stream) = relay();
        let (config_loaded_relay, config_loaded_stream) = relay();
        let (reply_received_relay, reply_received_stream) = relay::<(RequestId, Reply)>();

        let events: Vec<BoxStream<'static, ColumnsEvent>> = vec![
            upload_selected_stream.map(ColumnsEvent::UploadSelected).boxed(),
            library_file_picked_stream.map(ColumnsEvent::LibraryFilePicked).boxed(),
            search_changed_stream.map(ColumnsEvent::SearchChanged).boxed(),
            start_time_changed_stream.map(ColumnsEvent::StartTimeChanged).boxed(),
            end_time_changed_stream.map(ColumnsEvent::EndTimeChanged).boxed(),
            apply_time_filter_clicked_stream.map(|()| ColumnsEvent::ApplyTimeFilter).boxed(),
            clear_filters_clicked_stream.map(|()| ColumnsEvent::ClearFilters).boxed(),
            sort_clicked_stream.map(|()| ColumnsEvent::SortClicked).boxed(),
            row_toggled_stream.map(ColumnsEvent::RowToggled).boxed(),
            select_all_clicked_stream.map(|()| ColumnsEvent::SelectAllClicked).boxed(),
            confirm_clicked_stream.map(|()| ColumnsEvent::ConfirmClicked).boxed(),
            save_clicked_stream.map(|()| ColumnsEvent::SaveClicked).boxed(),
            cancel_clicked_stream.map(|()| ColumnsEvent::CancelClicked).boxed(),
            retry_clicked_stream.map(|()| ColumnsEvent::RetryClicked).boxed(),
            model_search_changed_stream.map(ColumnsEvent::ModelSearchChanged).boxed(),
            model_selected_stream.map(ColumnsEvent::ModelSelected).boxed(),
            model_parameter_changed_stream
                .map(|(key, value)| ColumnsEvent::ModelParameterChanged(key, value))
                .boxed(),
            model_run_clicked_stream.map(ColumnsEvent::ModelRunClicked).boxed(),
            list_scrolled_stream.map(ColumnsEvent::ListScrolled).boxed(),
            viewport_measured_stream.map(ColumnsEvent::ViewportMeasured).boxed(),
            config_loaded_stream.map(ColumnsEvent::ConfigLoaded).boxed(),
            reply_received_stream
                .map(|(request, reply)| ColumnsEvent::ReplyReceived(request, reply))
                .boxed(),
        ];

        let pool = MutableVec::new();
        let selected_count = Mutable::new(0);
        let mut state = ColumnsState::new(
            &UiSection::default(),
            pool.clone(),
            selected_count.clone(),
            outbox,
            toasts,
        );

        let snapshot = Actor::new(state.snapshot(), async move |snapshot| {
            let mut events = stream::select_all(events);
            while let Some(event) = events.next().await {
                let publish = event.changes_snapshot();
                state.handle(event);
                if publish {
                    snapshot.set_neq(state.snapshot());
                }
            }
        });

        Self {
            snapshot,
            selected_count: selected_count.read_only(),
            pool,
            upload_selected_relay,
            library_file_picked_relay,
            search_changed_relay,
            start_time_changed_relay,
            end_time_changed_relay,
            apply_time_filter_clicked_relay,
            clear_filters_clicked_relay,
            sort_clicked_relay,
            row_toggled_relay,
            select_all_clicked_relay,
            confirm_clicked_relay,
            save_clicked_relay,
            cancel_clicked_relay,
            retry_clicked_relay,
            model_search_changed_relay,
            model_selected_relay,
            model_parameter_changed_relay,
            model_run_clicked_relay,
            list_scrolled_relay,
            viewport_measured_relay,
            config_loaded_relay,
            reply_received_relay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::UnboundedReceiver;
    use shared::workflow::{TableMeta, UploadResponse};

    struct Harness {
        state: ColumnsState,
        pool: MutableVec<PoolSlot>,
        selected_count: Mutable<usize>,
        outbox: UnboundedReceiver<Outgoing>,
        toasts: UnboundedReceiver<ErrorAlert>,
    }

    impl Harness {
        fn new() -> Self {
            let (outbox_relay, outbox) = relay();
            let (toast_relay, toasts) = relay();
            let pool = MutableVec::new();
            let selected_count = Mutable::new(0);
            let state = ColumnsState::new(
                &UiSection::default(),
                pool.clone(),
                selected_count.clone(),
                outbox_relay,
                toast_relay,
            );
            Self {
                state,
                pool,
                selected_count,
                outbox,
                toasts,
            }
        }

        fn sent(&mut self) -> Vec<Outgoing> {
            std::iter::from_fn(|| self.outbox.try_next().ok().flatten()).collect()
        }

        fn toast_titles(&mut self) -> Vec<String> {
            std::iter::from_fn(|| self.toasts.try_next().ok().flatten())
                .map(|alert| alert.title)
                .collect()
        }

        fn visible_names(&self) -> Vec<String> {
            self.pool
                .lock_ref()
                .iter()
                .filter(|slot| slot.visible.get())
                .map(|slot| slot.name.get_cloned())
                .collect()
        }

        /// Uploads a table and answers the request.
        fn load(&mut self, task_id: &str, columns: &[&str]) -> RequestId {
            self.state.handle(ColumnsEvent::UploadSelected(PickedUpload {
                file_name: "table.csv".into(),
                bytes: b"a,b\n1,2\n".to_vec(),
            }));
            let request = match self.sent().pop() {
                Some(Outgoing::Run { request, call: WorkflowCall::UploadTable { .. } }) => request,
                other => panic!("expected an upload, got {other:?}"),
            };
            self.state.handle(ColumnsEvent::ReplyReceived(
                request,
                Reply::Completed(WorkflowOutcome::TableLoaded(upload(task_id, columns))),
            ));
            request
        }
    }

    fn upload(task_id: &str, columns: &[&str]) -> UploadResponse {
        UploadResponse {
            url: format!("https://files.example/{task_id}.csv"),
            task_id: task_id.to_string(),
            is_tmp: true,
            origin_fn: Some("table.csv".into()),
            file_name: Some("table.csv".into()),
            result: TableMeta {
                columns: columns.iter().map(|name| name.to_string()).collect(),
                index_range: vec!["2024-01-01 00:00:00".into(), "2024-06-30 00:00:00".into()],
            },
        }
    }

    #[test]
    fn loaded_table_is_rendered_into_the_pool() {
        let mut harness = Harness::new();
        harness.load("t1", &["temp", "pressure", "flow"]);

        let snapshot = harness.state.snapshot();
        assert_eq!(snapshot.load, LoadState::Ready);
        assert_eq!(snapshot.total_rows, 3);
        assert_eq!(snapshot.content_height, 150.0);
        assert_eq!(snapshot.lower_limit, "2024-01-01 00:00:00");
        assert_eq!(harness.visible_names(), ["temp", "pressure", "flow"]);
        assert_eq!(harness.toast_titles(), ["Loaded table.csv"]);
    }

    #[test]
    fn search_filters_the_rendered_rows_and_keeps_selection() {
        let mut harness = Harness::new();
        harness.load("t1", &["temp_in", "temp_out", "pressure"]);

        harness.state.handle(ColumnsEvent::RowToggled("pressure".into()));
        harness.state.handle(ColumnsEvent::SearchChanged("TEMP".into()));

        assert_eq!(harness.visible_names(), ["temp_in", "temp_out"]);
        assert_eq!(harness.selected_count.get(), 1);

        harness.state.handle(ColumnsEvent::SelectAllClicked);
        assert_eq!(harness.selected_count.get(), 3);
        assert!(harness.state.snapshot().all_visible_selected);
    }

    #[test]
    fn select_all_flag_follows_toggles_and_reloads() {
        let mut harness = Harness::new();
        harness.load("t1", &["a", "b"]);

        harness.state.handle(ColumnsEvent::SelectAllClicked);
        assert!(harness.state.snapshot().all_visible_selected);

        harness.state.handle(ColumnsEvent::RowToggled("b".into()));
        assert!(!harness.state.snapshot().all_visible_selected);

        harness.state.handle(ColumnsEvent::SelectAllClicked);
        harness.load("t2", &["a", "b", "c"]);
        assert!(!harness.state.snapshot().all_visible_selected);
        assert_eq!(harness.selected_count.get(), 2);
    }

    #[test]
    fn only_scrolling_skips_the_snapshot() {
        assert!(!ColumnsEvent::ListScrolled(120.0).changes_snapshot());
        assert!(ColumnsEvent::ViewportMeasured(400.0).changes_snapshot());
        assert!(ColumnsEvent::RowToggled("a".into()).changes_snapshot());
    }

    #[test]
    fn confirm_without_selection_sends_nothing() {
        let mut harness = Harness::new();
        harness.load("t1", &["a"]);
        harness.toast_titles();

        harness.state.handle(ColumnsEvent::ConfirmClicked);

        assert!(harness.sent().is_empty());
        assert_eq!(harness.toast_titles(), ["Check Your Selection"]);
        assert_eq!(harness.state.snapshot().summary, None);
    }

    #[test]
    fn confirm_sends_report_and_shows_summary() {
        let mut harness = Harness::new();
        harness.load("t1", &["a", "b"]);
        harness.state.handle(ColumnsEvent::RowToggled("b".into()));

        harness.state.handle(ColumnsEvent::ConfirmClicked);

        let request = match harness.sent().as_slice() {
            [Outgoing::Run { request, call: WorkflowCall::RenderReport(report) }] => {
                assert_eq!(report.columns, ["b"]);
                assert_eq!(report.start_time, "2024-01-01 00:00:00");
                *request
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(harness.state.snapshot().busy, Some("render report"));
        assert_eq!(harness.state.snapshot().summary.unwrap().columns, ["b"]);

        harness.state.handle(ColumnsEvent::ReplyReceived(
            request,
            Reply::Completed(WorkflowOutcome::Report { url: "https://r/1.pdf".into() }),
        ));
        let snapshot = harness.state.snapshot();
        assert_eq!(snapshot.busy, None);
        assert_eq!(snapshot.result, Some(ActionResult::Report { url: "https://r/1.pdf".into() }));
    }

    #[test]
    fn cancel_releases_the_load_and_ignores_the_late_reply() {
        let mut harness = Harness::new();
        harness.state.handle(ColumnsEvent::LibraryFilePicked("sales.csv".into()));
        let request = match harness.sent().pop() {
            Some(Outgoing::Run { request, .. }) => request,
            other => panic!("unexpected {other:?}"),
        };

        harness.state.handle(ColumnsEvent::CancelClicked);
        assert!(matches!(harness.sent().as_slice(), [Outgoing::Cancel { request: cancelled }] if *cancelled == request));
        assert_eq!(harness.state.snapshot().load, LoadState::Cancelled);

        harness.state.handle(ColumnsEvent::ReplyReceived(
            request,
            Reply::Completed(WorkflowOutcome::TableLoaded(upload("late", &["x"]))),
        ));
        assert_eq!(harness.state.snapshot().total_rows, 0);
    }

    #[test]
    fn replacing_a_table_drops_the_previous_task() {
        let mut harness = Harness::new();
        harness.load("t1", &["a"]);
        harness.load("t2", &["a", "b"]);

        let sent = harness.sent();
        assert!(matches!(
            sent.as_slice(),
            [Outgoing::Run { call: WorkflowCall::DropTask { task_id }, .. }] if task_id == "t1"
        ));
    }

    #[test]
    fn failed_load_keeps_the_previous_table() {
        let mut harness = Harness::new();
        harness.load("t1", &["a", "b"]);
        harness.toast_titles();

        harness.state.handle(ColumnsEvent::LibraryFilePicked("broken.csv".into()));
        let request = match harness.sent().pop() {
            Some(Outgoing::Run { request, .. }) => request,
            other => panic!("unexpected {other:?}"),
        };
        harness.state.handle(ColumnsEvent::ReplyReceived(
            request,
            Reply::Failed(WorkflowFailure::MalformedResponse("no task_id".into())),
        ));

        assert_eq!(harness.toast_titles(), ["Data Format Error"]);
        assert_eq!(harness.state.snapshot().total_rows, 2);
        assert_eq!(harness.visible_names(), ["a", "b"]);
        assert_eq!(harness.state.snapshot().retry, None);
    }

    #[test]
    fn failed_library_open_is_retried_with_the_same_call() {
        let mut harness = Harness::new();
        harness.state.handle(ColumnsEvent::LibraryFilePicked("sales.csv".into()));
        let request = match harness.sent().pop() {
            Some(Outgoing::Run { request, .. }) => request,
            other => panic!("unexpected {other:?}"),
        };
        harness.state.handle(ColumnsEvent::ReplyReceived(
            request,
            Reply::Failed(WorkflowFailure::Network("connection reset".into())),
        ));

        let snapshot = harness.state.snapshot();
        assert!(matches!(snapshot.load, LoadState::Error(_)));
        assert_eq!(snapshot.retry.map(|offer| offer.label), Some("open from library"));

        harness.state.handle(ColumnsEvent::RetryClicked);
        let retried = match harness.sent().as_slice() {
            [Outgoing::Run { request, call: WorkflowCall::OpenFromLibrary { file_name } }] => {
                assert_eq!(file_name, "sales.csv");
                *request
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_ne!(retried, request);
        assert_eq!(harness.state.snapshot().load, LoadState::Loading);
        assert_eq!(harness.state.snapshot().retry, None);

        harness.state.handle(ColumnsEvent::RetryClicked);
        assert!(harness.sent().is_empty());

        harness.state.handle(ColumnsEvent::ReplyReceived(
            retried,
            Reply::Completed(WorkflowOutcome::TableLoaded(upload("t1", &["a", "b"]))),
        ));
        assert_eq!(harness.state.snapshot().total_rows, 2);
    }

    #[test]
    fn failed_report_is_retried_with_the_same_columns() {
        let mut harness = Harness::new();
        harness.load("t1", &["a", "b"]);
        harness.state.handle(ColumnsEvent::RowToggled("a".into()));
        harness.state.handle(ColumnsEvent::ConfirmClicked);
        let request = match harness.sent().pop() {
            Some(Outgoing::Run { request, call: WorkflowCall::RenderReport(_) }) => request,
            other => panic!("unexpected {other:?}"),
        };
        harness.state.handle(ColumnsEvent::ReplyReceived(
            request,
            Reply::Failed(WorkflowFailure::Status { code: 503, body: String::new() }),
        ));
        assert_eq!(harness.state.snapshot().busy, None);
        assert_eq!(
            harness.state.snapshot().retry.map(|offer| offer.label),
            Some("render report")
        );

        harness.state.handle(ColumnsEvent::RetryClicked);
        assert!(matches!(
            harness.sent().as_slice(),
            [Outgoing::Run { call: WorkflowCall::RenderReport(report), .. }] if report.columns == ["a"]
        ));
        assert_eq!(harness.state.snapshot().busy, Some("render report"));
    }

    #[test]
    fn unmeasurable_viewport_renders_every_row() {
        let mut harness = Harness::new();
        let columns: Vec<String> = (0..30).map(|index| format!("c{index:02}")).collect();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        harness.load("t1", &columns);
        assert_eq!(harness.visible_names().len(), 10);

        harness.state.handle(ColumnsEvent::ViewportMeasured(0.0));

        assert_eq!(harness.visible_names().len(), 30);
    }

    #[test]
    fn model_run_requires_a_model() {
        let mut harness = Harness::new();
        harness.load("t1", &["a"]);
        harness.state.handle(ColumnsEvent::RowToggled("a".into()));
        harness.toast_titles();

        harness.state.handle(ColumnsEvent::ModelRunClicked(RunMode::Preview));
        assert!(harness.sent().is_empty());
        assert_eq!(harness.toast_titles(), ["Check Your Selection"]);

        let mut config = shared::AppConfig::with_sample_models().client_config();
        config.ui.item_height = 40.0;
        harness.state.handle(ColumnsEvent::ConfigLoaded(config));
        harness.state.handle(ColumnsEvent::ModelSelected("Decision tree".into()));
        harness.state.handle(ColumnsEvent::ModelParameterChanged("window".into(), "5".into()));
        harness.state.handle(ColumnsEvent::ModelRunClicked(RunMode::Submit));

        match harness.sent().as_slice() {
            [Outgoing::Run { call: WorkflowCall::RunModel(request), .. }] => {
                assert_eq!(request.model, "Decision tree");
                assert_eq!(request.mode, RunMode::Submit);
                assert_eq!(request.parameters["window"], "5");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(harness.state.snapshot().item_height, 40.0);
    }
}

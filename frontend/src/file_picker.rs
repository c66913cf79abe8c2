//! Library file dialog: a paged, searchable single-select over stored files.

use crate::connection::{Outgoing, Reply};
use crate::dataflow::{Actor, Relay, relay};
use crate::error_display::make_error_user_friendly;
use crate::theme::*;
use futures::stream::{self, BoxStream, StreamExt};
use shared::picker::{FilePicker, ModalState};
use shared::{ClientConfig, RequestId, Row as FileRow, UiSection, WorkflowCall, WorkflowFailure, WorkflowOutcome};
use zoon::events::{Click, DoubleClick, KeyDown};
use zoon::*;

#[derive(Debug, Clone)]
pub enum FilePickerEvent {
    OpenClicked,
    RetryClicked,
    CancelClicked,
    CloseClicked,
    SearchChanged(String),
    NextPage,
    PrevPage,
    RowClicked(String),
    RowDoubleClicked(String),
    EnterPressed,
    ConfigLoaded(ClientConfig),
    ReplyReceived(RequestId, Reply),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePickerSnapshot {
    pub state: ModalState,
    pub search: String,
    pub rows: Vec<FileRow>,
    pub highlighted: Option<String>,
    pub page_label: String,
    pub has_next: bool,
    pub has_prev: bool,
    pub total_files: usize,
    pub matching_files: usize,
}

pub struct FilePickerState {
    picker: FilePicker,
    page_size: usize,
    pending: Option<RequestId>,
    picked: Relay<String>,
    outbox: Relay<Outgoing>,
}

impl FilePickerState {
    pub fn new(page_size: usize, picked: Relay<String>, outbox: Relay<Outgoing>) -> Self {
        Self {
            picker: build_picker(page_size, &picked),
            page_size,
            pending: None,
            picked,
            outbox,
        }
    }

    pub fn handle(&mut self, event: FilePickerEvent) {
        match event {
            FilePickerEvent::OpenClicked => {
                self.rebuild_if_resized();
                let ticket = self.picker.open();
                self.request_list(ticket.map(|ticket| ticket.id));
            }
            FilePickerEvent::RetryClicked => {
                let ticket = self.picker.retry();
                self.request_list(ticket.map(|ticket| ticket.id));
            }
            FilePickerEvent::CancelClicked => {
                let abandoned = self.picker.cancel();
                self.abandon(abandoned);
            }
            FilePickerEvent::CloseClicked => {
                let abandoned = self.picker.close();
                self.abandon(abandoned);
                self.rebuild_if_resized();
            }
            FilePickerEvent::SearchChanged(term) => self.picker.set_search(&term),
            FilePickerEvent::NextPage => {
                self.picker.next_page();
            }
            FilePickerEvent::PrevPage => {
                self.picker.prev_page();
            }
            FilePickerEvent::RowClicked(name) => self.picker.highlight(&name),
            FilePickerEvent::RowDoubleClicked(name) => self.activate(&name),
            FilePickerEvent::EnterPressed => {
                if let Some(name) = self.picker.highlighted().map(str::to_string) {
                    self.activate(&name);
                }
            }
            FilePickerEvent::ConfigLoaded(config) => {
                self.page_size = config.ui.page_size;
                self.rebuild_if_resized();
            }
            FilePickerEvent::ReplyReceived(request, reply) => self.reply_received(request, reply),
        }
    }

    fn activate(&mut self, name: &str) {
        if self.picker.activate(name) {
            self.rebuild_if_resized();
        }
    }

    /// Page size changes only take effect on a closed dialog.
    fn rebuild_if_resized(&mut self) {
        if self.picker.state().is_open() || self.pending.is_some() {
            return;
        }
        if self.picker.page_size() != self.page_size {
            self.picker = build_picker(self.page_size, &self.picked);
        }
    }

    fn request_list(&mut self, request: Option<RequestId>) {
        let Some(request) = request else {
            return;
        };
        self.pending = Some(request);
        self.outbox.send(Outgoing::Run {
            request,
            call: WorkflowCall::ListFiles,
        });
    }

    fn abandon(&mut self, request: Option<RequestId>) {
        if let Some(request) = request {
            self.outbox.send(Outgoing::Cancel { request });
        }
        self.pending = None;
    }

    fn reply_received(&mut self, request: RequestId, reply: Reply) {
        if self.pending != Some(request) {
            return;
        }
        self.pending = None;
        let result = match reply.into_outcome() {
            Ok(Some(WorkflowOutcome::FileList(files))) => Ok(files),
            Ok(Some(other)) => Err(WorkflowFailure::MalformedResponse(format!(
                "expected a file list, got {other:?}"
            ))),
            Ok(None) => {
                self.picker.cancel();
                return;
            }
            Err(failure) => Err(failure),
        };
        self.picker.file_list_loaded(request, result);
    }

    pub fn snapshot(&self) -> FilePickerSnapshot {
        FilePickerSnapshot {
            state: self.picker.state().clone(),
            search: self.picker.search().to_string(),
            rows: self.picker.page_rows().into_iter().cloned().collect(),
            highlighted: self.picker.highlighted().map(str::to_string),
            page_label: self.picker.pagination().label(),
            has_next: self.picker.has_next(),
            has_prev: self.picker.has_prev(),
            total_files: self.picker.total_files(),
            matching_files: self.picker.matching_files(),
        }
    }
}

fn build_picker(page_size: usize, picked: &Relay<String>) -> FilePicker {
    let mut picker = FilePicker::new(page_size);
    let picked = picked.clone();
    picker.on_confirm(move |name| picked.send(name.to_string()));
    picker
}

#[derive(Clone)]
pub struct FilePickerDomain {
    pub snapshot: Actor<FilePickerSnapshot>,

    pub open_clicked_relay: Relay<()>,
    pub retry_clicked_relay: Relay<()>,
    pub cancel_clicked_relay: Relay<()>,
    pub close_clicked_relay: Relay<()>,
    pub search_changed_relay: Relay<String>,
    pub next_page_relay: Relay<()>,
    pub prev_page_relay: Relay<()>,
    pub row_clicked_relay: Relay<String>,
    pub row_double_clicked_relay: Relay<String>,
    pub enter_pressed_relay: Relay<()>,
    pub config_loaded_relay: Relay<ClientConfig>,
    pub reply_received_relay: Relay<(RequestId, Reply)>,
}

impl FilePickerDomain {
    /// `picked` receives the name of every activated file.
    pub fn new(outbox: Relay<Outgoing>, picked: Relay<String>) -> Self {
        let (open_clicked_relay, open_clicked_stream) = relay();
        let (retry_clicked_relay, retry_clicked_stream) = relay();
        let (cancel_clicked_relay, cancel_clicked_stream) = relay();
        let (close_clicked_relay, close_clicked_stream) = relay();
        let (search_changed_relay, search_changed_stream) = relay();
        let (next_page_relay, next_page_stream) = relay();
        let (prev_page_relay, prev_page_stream) = relay();
        let (row_clicked_relay, row_clicked_stream) = relay();
        let (row_double_clicked_relay, row_double_clicked_stream) = relay();
        let (enter_pressed_relay, enter_pressed_stream) = relay();
        let (config_loaded_relay, config_loaded_stream) = relay();
        let (reply_received_relay, reply_received_stream) = relay::<(RequestId, Reply)>();

        let events: Vec<BoxStream<'static, FilePickerEvent>> = vec![
            open_clicked_stream.map(|()| FilePickerEvent::OpenClicked).boxed(),
            retry_clicked_stream.map(|()| FilePickerEvent::RetryClicked).boxed(),
            cancel_clicked_stream.map(|()| FilePickerEvent::CancelClicked).boxed(),
            close_clicked_stream.map(|()| FilePickerEvent::CloseClicked).boxed(),
            search_changed_stream.map(FilePickerEvent::SearchChanged).boxed(),
            next_page_stream.map(|()| FilePickerEvent::NextPage).boxed(),
            prev_page_stream.map(|()| FilePickerEvent::PrevPage).boxed(),
            row_clicked_stream.map(FilePickerEvent::RowClicked).boxed(),
            row_double_clicked_stream.map(FilePickerEvent::RowDoubleClicked).boxed(),
            enter_pressed_stream.map(|()| FilePickerEvent::EnterPressed).boxed(),
            config_loaded_stream.map(FilePickerEvent::ConfigLoaded).boxed(),
            reply_received_stream
                .map(|(request, reply)| FilePickerEvent::ReplyReceived(request, reply))
                .boxed(),
        ];

        let mut state = FilePickerState::new(UiSection::default().page_size, picked, outbox);
        let snapshot = Actor::new(state.snapshot(), async move |snapshot| {
            let mut events = stream::select_all(events);
            while let Some(event) = events.next().await {
                state.handle(event);
                snapshot.set_neq(state.snapshot());
            }
        });

        Self {
            snapshot,
            open_clicked_relay,
            retry_clicked_relay,
            cancel_clicked_relay,
            close_clicked_relay,
            search_changed_relay,
            next_page_relay,
            prev_page_relay,
            row_clicked_relay,
            row_double_clicked_relay,
            enter_pressed_relay,
            config_loaded_relay,
            reply_received_relay,
        }
    }
}

/// Modal overlay, present only while the dialog is open.
pub fn file_library_dialog(file_picker: FilePickerDomain) -> impl Element {
    El::new().child_signal(
        file_picker
            .snapshot
            .signal_ref(|snapshot| snapshot.state.is_open())
            .dedupe()
            .map_true(move || dialog_overlay(file_picker.clone())),
    )
}

fn dialog_overlay(file_picker: FilePickerDomain) -> impl Element {
    El::new()
        .s(Background::new().color(overlay()))
        .s(Width::fill())
        .s(Height::fill())
        .s(Padding::all(40))
        .update_raw_el(|raw_el| {
            raw_el
                .style("display", "flex")
                .style("position", "fixed")
                .style("inset", "0")
                .style("z-index", "20000")
                .style("justify-content", "center")
                .style("align-items", "center")
        })
        .update_raw_el({
            let file_picker = file_picker.clone();
            move |raw_el| {
                raw_el
                    .event_handler({
                        let close_clicked_relay = file_picker.close_clicked_relay.clone();
                        move |_event: Click| close_clicked_relay.send(())
                    })
                    .global_event_handler(move |event: KeyDown| match event.key().as_str() {
                        "Escape" => file_picker.close_clicked_relay.send(()),
                        "Enter" => file_picker.enter_pressed_relay.send(()),
                        _ => {}
                    })
            }
        })
        .child(
            Column::new()
                .s(Background::new().color(panel()))
                .s(RoundedCorners::all(CORNER_RADIUS_8))
                .s(Borders::all(Border::new().width(1).color(border())))
                .s(Padding::all(SPACING_16))
                .s(Gap::new().y(SPACING_12))
                .s(Width::fill().min(500).max(640))
                .s(Height::fill().max(720))
                .update_raw_el(|raw_el| raw_el.event_handler(|event: Click| event.stop_propagation()))
                .item(
                    El::new()
                        .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::Bold).color(text()))
                        .child("Open From Library"),
                )
                .item(search_input(file_picker.clone()))
                .item(
                    El::new()
                        .s(Width::fill())
                        .s(Height::fill())
                        .s(Borders::all(Border::new().width(1).color(border())))
                        .s(RoundedCorners::all(CORNER_RADIUS_4))
                        .update_raw_el(|raw_el| raw_el.style("min-height", "0").style("overflow-y", "auto"))
                        .child_signal(
                            file_picker
                                .snapshot
                                .signal_ref(|snapshot| snapshot.state.clone())
                                .dedupe_cloned()
                                .map({
                                    let file_picker = file_picker.clone();
                                    move |state| dialog_body(state, file_picker.clone())
                                }),
                        ),
                )
                .item(pagination_row(file_picker.clone()))
                .item(
                    Row::new()
                        .s(Gap::new().x(SPACING_12))
                        .s(Align::new().right())
                        .item(button_disabled_signal(
                            "Cancel Request",
                            file_picker
                                .snapshot
                                .signal_ref(|snapshot| snapshot.state != ModalState::Loading),
                            {
                                let cancel_clicked_relay = file_picker.cancel_clicked_relay.clone();
                                move || cancel_clicked_relay.send(())
                            },
                        ))
                        .item(button("Close", {
                            let close_clicked_relay = file_picker.close_clicked_relay.clone();
                            move || close_clicked_relay.send(())
                        })),
                ),
        )
}

fn search_input(file_picker: FilePickerDomain) -> impl Element {
    TextInput::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_8).y(6))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .label_hidden("Search files")
        .placeholder(Placeholder::new("Search files"))
        .text_signal(file_picker.snapshot.signal_ref(|snapshot| snapshot.search.clone()))
        .on_change(move |text| file_picker.search_changed_relay.send(text))
        .focus(true)
}

fn dialog_body(state: ModalState, file_picker: FilePickerDomain) -> RawElOrText {
    match state {
        ModalState::Closed | ModalState::Loading => centered_message("Loading files...").unify(),
        ModalState::Error(failure) => retry_panel(
            format!("Files could not be listed. {}", make_error_user_friendly(&failure)),
            file_picker,
        )
        .unify(),
        ModalState::Cancelled => centered_message("Listing was cancelled. Close and reopen to list again.").unify(),
        ModalState::Ready => Column::new()
            .s(Width::fill())
            .items_signal_vec(
                file_picker
                    .snapshot
                    .signal_ref(|snapshot| (snapshot.rows.clone(), snapshot.highlighted.clone()))
                    .map(|(rows, highlighted)| {
                        rows.into_iter()
                            .map(|row| {
                                let is_highlighted = highlighted.as_deref() == Some(row.name.as_str());
                                (row, is_highlighted)
                            })
                            .collect::<Vec<_>>()
                    })
                    .to_signal_vec()
                    .map(move |(row, is_highlighted)| file_row(row, is_highlighted, file_picker.clone())),
            )
            .unify(),
    }
}

fn centered_message(message: impl Into<String>) -> impl Element {
    El::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_16))
        .s(Align::center())
        .s(Font::new().size(FONT_SIZE_14).color(text_muted()).italic())
        .child(message.into())
}

fn retry_panel(message: String, file_picker: FilePickerDomain) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_16))
        .s(Gap::new().y(SPACING_12))
        .s(Align::center())
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).color(error()).wrap_anywhere())
                .child(message),
        )
        .item(button("Retry", move || file_picker.retry_clicked_relay.send(())))
}

fn file_row(row: FileRow, is_highlighted: bool, file_picker: FilePickerDomain) -> impl Element {
    let hovered = Mutable::new(false);
    let name = row.name.clone();
    Row::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_12).y(SPACING_8))
        .s(Gap::new().x(SPACING_12))
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Background::new().color_signal(hovered.signal().map(move |hovered| {
            if is_highlighted {
                row_checked()
            } else if hovered {
                row_hover()
            } else {
                panel()
            }
        })))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .on_click({
            let row_clicked_relay = file_picker.row_clicked_relay.clone();
            let name = name.clone();
            move || row_clicked_relay.send(name.clone())
        })
        .update_raw_el(move |raw_el| {
            raw_el.event_handler(move |_event: DoubleClick| {
                file_picker.row_double_clicked_relay.send(name.clone())
            })
        })
        .item(
            El::new()
                .s(Width::fill())
                .s(Font::new().size(FONT_SIZE_14).color(text()).no_wrap())
                .child(row.name),
        )
        .item(muted_text(row.size.unwrap_or_default()))
        .item(muted_text(row.modified.unwrap_or_default()))
}

fn pagination_row(file_picker: FilePickerDomain) -> impl Element {
    Row::new()
        .s(Width::fill())
        .s(Gap::new().x(SPACING_8))
        .s(Align::new().center_y())
        .item(button_disabled_signal(
            "‹ Prev",
            file_picker.snapshot.signal_ref(|snapshot| !snapshot.has_prev),
            {
                let prev_page_relay = file_picker.prev_page_relay.clone();
                move || prev_page_relay.send(())
            },
        ))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).color(text()))
                .child_signal(file_picker.snapshot.signal_ref(|snapshot| snapshot.page_label.clone())),
        )
        .item(button_disabled_signal(
            "Next ›",
            file_picker.snapshot.signal_ref(|snapshot| !snapshot.has_next),
            {
                let next_page_relay = file_picker.next_page_relay.clone();
                move || next_page_relay.send(())
            },
        ))
        .item(
            El::new()
                .s(Align::new().right())
                .s(Font::new().size(FONT_SIZE_12).color(text_muted()))
                .child_signal(file_picker.snapshot.signal_ref(|snapshot| {
                    format!("{} of {} files", snapshot.matching_files, snapshot.total_files)
                })),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::UnboundedReceiver;

    struct Harness {
        state: FilePickerState,
        outbox: UnboundedReceiver<Outgoing>,
        picked: UnboundedReceiver<String>,
    }

    impl Harness {
        fn new(page_size: usize) -> Self {
            let (outbox_relay, outbox) = relay();
            let (picked_relay, picked) = relay();
            Self {
                state: FilePickerState::new(page_size, picked_relay, outbox_relay),
                outbox,
                picked,
            }
        }

        fn open(&mut self) -> RequestId {
            self.state.handle(FilePickerEvent::OpenClicked);
            match self.outbox.try_next() {
                Ok(Some(Outgoing::Run { request, call: WorkflowCall::ListFiles })) => request,
                other => panic!("expected a file list request, got {other:?}"),
            }
        }

        fn open_with(&mut self, names: &[&str]) {
            let request = self.open();
            let files = names
                .iter()
                .map(|name| FileRow::file(*name, "2 KB", "2024-03-01"))
                .collect();
            self.state.handle(FilePickerEvent::ReplyReceived(
                request,
                Reply::Completed(WorkflowOutcome::FileList(files)),
            ));
        }
    }

    #[test]
    fn opening_lists_the_first_page() {
        let mut harness = Harness::new(2);
        harness.open_with(&["a.csv", "b.csv", "c.csv"]);

        let snapshot = harness.state.snapshot();
        assert_eq!(snapshot.state, ModalState::Ready);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.page_label, "Page 1 / 2");
        assert!(snapshot.has_next);

        harness.state.handle(FilePickerEvent::NextPage);
        let names: Vec<String> = harness.state.snapshot().rows.into_iter().map(|row| row.name).collect();
        assert_eq!(names, ["c.csv"]);
    }

    #[test]
    fn double_click_picks_and_closes() {
        let mut harness = Harness::new(10);
        harness.open_with(&["sales.csv", "costs.csv"]);

        harness.state.handle(FilePickerEvent::RowClicked("costs.csv".into()));
        assert_eq!(harness.state.snapshot().highlighted.as_deref(), Some("costs.csv"));
        assert!(harness.picked.try_next().is_err());

        harness.state.handle(FilePickerEvent::RowDoubleClicked("costs.csv".into()));
        assert_eq!(harness.picked.try_next().ok().flatten().as_deref(), Some("costs.csv"));
        assert_eq!(harness.state.snapshot().state, ModalState::Closed);
    }

    #[test]
    fn enter_activates_the_highlighted_file() {
        let mut harness = Harness::new(10);
        harness.open_with(&["sales.csv"]);

        harness.state.handle(FilePickerEvent::EnterPressed);
        assert!(harness.picked.try_next().is_err());

        harness.state.handle(FilePickerEvent::RowClicked("sales.csv".into()));
        harness.state.handle(FilePickerEvent::EnterPressed);
        assert_eq!(harness.picked.try_next().ok().flatten().as_deref(), Some("sales.csv"));
    }

    #[test]
    fn failure_offers_retry() {
        let mut harness = Harness::new(10);
        let request = harness.open();
        harness.state.handle(FilePickerEvent::ReplyReceived(
            request,
            Reply::Failed(WorkflowFailure::Status { code: 502, body: String::new() }),
        ));
        assert!(matches!(harness.state.snapshot().state, ModalState::Error(_)));

        harness.state.handle(FilePickerEvent::RetryClicked);
        assert!(matches!(
            harness.outbox.try_next(),
            Ok(Some(Outgoing::Run { call: WorkflowCall::ListFiles, .. }))
        ));
        assert_eq!(harness.state.snapshot().state, ModalState::Loading);
    }

    #[test]
    fn cancelled_listing_sends_nothing_on_retry() {
        let mut harness = Harness::new(10);
        let request = harness.open();

        harness.state.handle(FilePickerEvent::CancelClicked);
        assert!(matches!(
            harness.outbox.try_next(),
            Ok(Some(Outgoing::Cancel { request: cancelled })) if cancelled == request
        ));

        harness.state.handle(FilePickerEvent::RetryClicked);
        assert!(harness.outbox.try_next().is_err());
        assert_eq!(harness.state.snapshot().state, ModalState::Cancelled);
    }

    #[test]
    fn closing_while_loading_cancels_and_ignores_the_reply() {
        let mut harness = Harness::new(10);
        let request = harness.open();

        harness.state.handle(FilePickerEvent::CloseClicked);
        assert!(matches!(
            harness.outbox.try_next(),
            Ok(Some(Outgoing::Cancel { request: cancelled })) if cancelled == request
        ));

        harness.state.handle(FilePickerEvent::ReplyReceived(
            request,
            Reply::Completed(WorkflowOutcome::FileList(vec![FileRow::file("late.csv", "", "")])),
        ));
        assert_eq!(harness.state.snapshot().state, ModalState::Closed);
        assert_eq!(harness.state.snapshot().total_files, 0);
    }

    #[test]
    fn page_size_from_config_applies_on_next_open() {
        let mut harness = Harness::new(10);
        let mut config = shared::AppConfig::default().client_config();
        config.ui.page_size = 1;
        harness.state.handle(FilePickerEvent::ConfigLoaded(config));

        harness.open_with(&["a.csv", "b.csv"]);

        assert_eq!(harness.state.snapshot().page_label, "Page 1 / 2");
    }
}

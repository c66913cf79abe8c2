use crate::columns::{ActionResult, ColumnsDomain, ColumnsSnapshot, RetryOffer};
use crate::dataflow::Relay;
use crate::error_display::{ErrorAlert, make_error_user_friendly};
use crate::file_picker::FilePickerDomain;
use crate::model_picker::model_panel;
use crate::theme::*;
use crate::upload::upload_button;
use crate::virtual_list::columns_virtual_list;
use futures::StreamExt;
use gloo_timers::future::TimeoutFuture;
use shared::explorer::{ConfirmationSummary, LoadState};
use zoon::*;

pub fn toolbar(columns: ColumnsDomain, file_picker: FilePickerDomain, toasts: Relay<ErrorAlert>) -> impl Element {
    Row::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_16).y(SPACING_8))
        .s(Gap::new().x(SPACING_8))
        .s(Align::new().center_y())
        .s(Background::new().color(panel_header()))
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::Bold).color(text()))
                .s(Padding::new().right(SPACING_16))
                .child("TableScope"),
        )
        .item(upload_button(columns.clone(), toasts))
        .item(button("Open From Library", move || file_picker.open_clicked_relay.send(())))
        .item(button_disabled_signal(
            "Save to Library",
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.file_name.is_none() || snapshot.saved),
            {
                let save_clicked_relay = columns.save_clicked_relay.clone();
                move || save_clicked_relay.send(())
            },
        ))
        .item_signal(
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.download_url.clone())
                .dedupe_cloned()
                .map(|url| url.map(|url| result_link("Download", url))),
        )
        .item(button_disabled_signal(
            "Cancel",
            columns.snapshot.signal_ref(|snapshot| snapshot.busy.is_none()),
            {
                let cancel_clicked_relay = columns.cancel_clicked_relay.clone();
                move || cancel_clicked_relay.send(())
            },
        ))
        .item(
            El::new()
                .s(Align::new().right())
                .s(Font::new().size(FONT_SIZE_14).color(text_muted()).no_wrap())
                .child_signal(columns.snapshot.signal_ref(|snapshot| {
                    let table = snapshot.file_name.clone().unwrap_or_else(|| "No table loaded".to_string());
                    match (snapshot.busy, &snapshot.load) {
                        (Some(busy), _) => format!("{table} · {busy}..."),
                        (None, LoadState::Cancelled) => format!("{table} · cancelled"),
                        (None, LoadState::Error(_)) => format!("{table} · load failed"),
                        (None, _) if snapshot.saved => format!("{table} · saved"),
                        (None, _) => table,
                    }
                })),
        )
}

pub fn content_area(columns: ColumnsDomain) -> impl Element {
    Row::new()
        .s(Width::fill())
        .s(Height::fill())
        .item(
            Column::new()
                .s(Width::exact(420))
                .s(Height::fill())
                .s(Borders::new().right(Border::new().width(1).color(border())))
                .item(filter_bar(columns.clone()))
                .item(selection_bar(columns.clone()))
                .item(
                    El::new()
                        .s(Width::fill())
                        .s(Height::fill())
                        .update_raw_el(|raw_el| raw_el.style("min-height", "0"))
                        .child_signal(
                            columns
                                .snapshot
                                .signal_ref(ListBody::of)
                                .dedupe_cloned()
                                .map({
                                    let columns = columns.clone();
                                    move |body| match body {
                                        ListBody::Empty => list_message(
                                            "Upload a table or open one from the library to begin.",
                                        )
                                        .unify(),
                                        ListBody::Failed(message) => list_message(message).unify(),
                                        ListBody::Table => columns_virtual_list(columns.clone()).unify(),
                                    }
                                }),
                        ),
                ),
        )
        .item(results_panel(columns.clone()))
        .item(model_panel(columns))
}

#[derive(Clone, PartialEq)]
enum ListBody {
    Empty,
    Failed(String),
    Table,
}

impl ListBody {
    fn of(snapshot: &ColumnsSnapshot) -> Self {
        if snapshot.total_rows > 0 || snapshot.busy.is_some() {
            return Self::Table;
        }
        match &snapshot.load {
            LoadState::Error(failure) => Self::Failed(format!(
                "The table could not be loaded. {}",
                make_error_user_friendly(failure)
            )),
            _ => Self::Empty,
        }
    }
}

fn list_message(message: impl Into<String>) -> impl Element {
    El::new()
        .s(Padding::all(SPACING_16))
        .s(Font::new().size(FONT_SIZE_14).color(text_muted()).italic())
        .child(message.into())
}

fn filter_bar(columns: ColumnsDomain) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_12))
        .s(Gap::new().y(SPACING_8))
        .s(Background::new().color(panel()))
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .item(search_input(columns.clone()))
        .item(
            Row::new()
                .s(Width::fill())
                .s(Gap::new().x(SPACING_8))
                .item(time_input(
                    "Start time",
                    columns.snapshot.signal_ref(|snapshot| snapshot.start_input.clone()),
                    columns.snapshot.signal_ref(|snapshot| snapshot.lower_limit.clone()),
                    columns.start_time_changed_relay.clone(),
                ))
                .item(time_input(
                    "End time",
                    columns.snapshot.signal_ref(|snapshot| snapshot.end_input.clone()),
                    columns.snapshot.signal_ref(|snapshot| snapshot.upper_limit.clone()),
                    columns.end_time_changed_relay.clone(),
                )),
        )
        .item(
            Row::new()
                .s(Gap::new().x(SPACING_8))
                .item(button("Apply Time Filter", {
                    let apply_time_filter_clicked_relay = columns.apply_time_filter_clicked_relay.clone();
                    move || apply_time_filter_clicked_relay.send(())
                }))
                .item(button("Clear Filters", {
                    let clear_filters_clicked_relay = columns.clear_filters_clicked_relay.clone();
                    move || clear_filters_clicked_relay.send(())
                }))
                .item(sort_button(columns)),
        )
}

/// Sends the term once typing pauses for the configured debounce.
fn search_input(columns: ColumnsDomain) -> impl Element {
    let generation = Mutable::new(0u64);
    TextInput::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_8).y(6))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .label_hidden("Search columns")
        .placeholder(Placeholder::new("Search columns"))
        .text_signal(
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.search.clone())
                .dedupe_cloned(),
        )
        .on_change(move |text| {
            let this_generation = generation.replace_with(|generation| *generation + 1) + 1;
            let generation = generation.clone();
            let search_changed_relay = columns.search_changed_relay.clone();
            let debounce = columns.snapshot.signal_ref(|snapshot| snapshot.search_debounce_ms);
            Task::start(async move {
                let delay = debounce.to_stream().next().await.unwrap_or_default();
                TimeoutFuture::new(delay).await;
                if generation.get() == this_generation {
                    search_changed_relay.send(text);
                }
            });
        })
}

fn time_input(
    label: &'static str,
    text_signal: impl Signal<Item = String> + Unpin + 'static,
    limit_signal: impl Signal<Item = String> + Unpin + 'static,
    changed_relay: Relay<String>,
) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(SPACING_4))
        .item(muted_text(label))
        .item(
            TextInput::new()
                .s(Width::fill())
                .s(Padding::new().x(SPACING_8).y(6))
                .s(Font::new().size(FONT_SIZE_14).color(text()))
                .s(Borders::all(Border::new().width(1).color(border())))
                .s(RoundedCorners::all(CORNER_RADIUS_4))
                .label_hidden(label)
                .placeholder(Placeholder::with_signal(limit_signal.dedupe_cloned()))
                .text_signal(text_signal.dedupe_cloned())
                .on_change(move |text| changed_relay.send(text)),
        )
}

fn sort_button(columns: ColumnsDomain) -> impl Element {
    let hovered = Mutable::new(false);
    Button::new()
        .s(Padding::new().x(SPACING_12).y(6))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(hovered.signal().map_bool(row_hover, panel)))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .label_signal(columns.snapshot.signal_ref(|snapshot| match snapshot.sort {
            Some(direction) => format!("Name {}", direction.arrow()),
            None => "Name ↕".to_string(),
        }))
        .on_press(move || columns.sort_clicked_relay.send(()))
}

fn selection_bar(columns: ColumnsDomain) -> impl Element {
    Row::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_12).y(SPACING_8))
        .s(Gap::new().x(SPACING_12))
        .s(Align::new().center_y())
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .item(
            Row::new()
                .s(Gap::new().x(SPACING_4))
                .s(Cursor::new(CursorIcon::Pointer))
                .s(Font::new().size(FONT_SIZE_14).color(text()))
                .on_click({
                    let select_all_clicked_relay = columns.select_all_clicked_relay.clone();
                    move || select_all_clicked_relay.send(())
                })
                .item(El::new().child_signal(
                    columns
                        .snapshot
                        .signal_ref(|snapshot| snapshot.all_visible_selected)
                        .map_bool(|| "☑", || "☐"),
                ))
                .item(El::new().child("Select all")),
        )
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_12).color(text_muted()).no_wrap())
                .child_signal(columns.snapshot.signal_ref(|snapshot| {
                    format!("{} of {} columns", snapshot.matching_rows, snapshot.total_rows)
                })),
        )
        .item(
            El::new()
                .s(Align::new().right())
                .s(Font::new().size(FONT_SIZE_12).color(text()).no_wrap())
                .child_signal(map_ref! {
                    let selected = columns.selected_count.signal(),
                    let max = columns.snapshot.signal_ref(|snapshot| snapshot.max_selected) => {
                        format!("{selected} / {max} selected")
                    }
                }),
        )
        .item(button("Confirm", move || columns.confirm_clicked_relay.send(())))
}

fn results_panel(columns: ColumnsDomain) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Padding::all(SPACING_16))
        .s(Gap::new().y(SPACING_12))
        .s(Background::new().color(background()))
        .update_raw_el(|raw_el| raw_el.style("overflow-y", "auto"))
        .item_signal(
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.summary.clone())
                .dedupe_cloned()
                .map(|summary| summary.map(summary_card)),
        )
        .item_signal(
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.retry.clone())
                .dedupe_cloned()
                .map({
                    let retry_clicked_relay = columns.retry_clicked_relay.clone();
                    move |offer| offer.map(|offer| retry_card(offer, retry_clicked_relay.clone()))
                }),
        )
        .item_signal(
            columns
                .snapshot
                .signal_ref(|snapshot| snapshot.result.clone())
                .dedupe_cloned()
                .map(|result| result.map(result_card)),
        )
}

fn retry_card(offer: RetryOffer, retry_clicked_relay: Relay<()>) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_12))
        .s(Gap::new().y(SPACING_8))
        .s(Background::new().color(panel()))
        .s(Borders::all(Border::new().width(1).color(error())))
        .s(RoundedCorners::all(CORNER_RADIUS_8))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).color(error()).wrap_anywhere())
                .child(format!("Could not {}. {}", offer.label, make_error_user_friendly(&offer.failure))),
        )
        .item(button("Retry", move || retry_clicked_relay.send(())))
}

fn summary_card(summary: ConfirmationSummary) -> impl Element {
    let filter_lines = summary.filter_lines();
    Column::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_12))
        .s(Gap::new().y(SPACING_4))
        .s(Background::new().color(panel()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(RoundedCorners::all(CORNER_RADIUS_8))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).weight(FontWeight::SemiBold).color(text()))
                .child(format!("Selected columns ({})", summary.columns.len())),
        )
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).color(text()).wrap_anywhere())
                .child(summary.columns.join(", ")),
        )
        .items(filter_lines.into_iter().map(muted_text))
}

fn result_card(result: ActionResult) -> impl Element {
    let (title, body) = match result {
        ActionResult::Report { url } => ("Report ready", result_link("Open report", url).unify()),
        ActionResult::ModelPreview { url } => ("Model preview ready", result_link("Open preview", url).unify()),
        ActionResult::ModelSubmitted { output } if shared::workflow::is_download_url(&output) => {
            ("Model run finished", result_link("Download output", output).unify())
        }
        ActionResult::ModelSubmitted { output } => (
            "Model run finished",
            El::new()
                .s(Font::new().size(FONT_SIZE_12).color(text()).wrap_anywhere())
                .child(output)
                .unify(),
        ),
        ActionResult::LibraryDownload { file_name, url } => (
            "Library file",
            Column::new()
                .s(Gap::new().y(SPACING_4))
                .item(muted_text(format!("{file_name} is stored as a download only.")))
                .item(result_link("Download", url))
                .unify(),
        ),
    };
    Column::new()
        .s(Width::fill())
        .s(Padding::all(SPACING_12))
        .s(Gap::new().y(SPACING_8))
        .s(Background::new().color(success_background()))
        .s(Borders::all(Border::new().width(1).color(success())))
        .s(RoundedCorners::all(CORNER_RADIUS_8))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).weight(FontWeight::SemiBold).color(success()))
                .child(title),
        )
        .item(body)
}

/// Result URLs open in a new tab from a real link, which popup blockers allow.
fn result_link(label: &str, url: String) -> impl Element {
    Link::new()
        .s(Font::new().size(FONT_SIZE_14).color(primary()).line(FontLine::new().underline()))
        .label(label.to_string())
        .to(url)
        .new_tab(NewTab::new())
}

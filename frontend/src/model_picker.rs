//! Model panel: searchable model list, editable parameters, preview and submit.

use crate::columns::{ColumnsDomain, ParameterField};
use crate::theme::*;
use shared::RunMode;
use zoon::*;

pub fn model_panel(columns: ColumnsDomain) -> impl Element {
    let models = columns.snapshot.signal_ref(|snapshot| snapshot.models.clone()).broadcast();

    Column::new()
        .s(Width::exact(320))
        .s(Height::fill())
        .s(Gap::new().y(SPACING_8))
        .s(Padding::all(SPACING_12))
        .s(Background::new().color(panel()))
        .s(Borders::new().left(Border::new().width(1).color(border())))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::SemiBold).color(text()))
                .child("Models"),
        )
        .item(
            TextInput::new()
                .s(Width::fill())
                .s(Padding::new().x(SPACING_8).y(6))
                .s(Font::new().size(FONT_SIZE_14).color(text()))
                .s(Borders::all(Border::new().width(1).color(border())))
                .s(RoundedCorners::all(CORNER_RADIUS_4))
                .label_hidden("Search models")
                .placeholder(Placeholder::new("Search models"))
                .text_signal(models.signal_ref(|models| models.search.clone()))
                .on_change({
                    let model_search_changed_relay = columns.model_search_changed_relay.clone();
                    move |text| model_search_changed_relay.send(text)
                }),
        )
        .item(
            Column::new()
                .s(Width::fill())
                .s(Height::exact(180))
                .s(Borders::all(Border::new().width(1).color(border())))
                .s(RoundedCorners::all(CORNER_RADIUS_4))
                .update_raw_el(|raw_el| raw_el.style("overflow-y", "auto"))
                .items_signal_vec(
                    models
                        .signal_ref(|models| {
                            models
                                .models
                                .iter()
                                .map(|name| (name.clone(), models.selected.as_deref() == Some(name.as_str())))
                                .collect::<Vec<_>>()
                        })
                        .to_signal_vec()
                        .map({
                            let columns = columns.clone();
                            move |(name, selected)| model_row(name, selected, columns.clone())
                        }),
                ),
        )
        .item_signal(
            models
                .signal_ref(|models| {
                    let fields: Vec<(String, String)> = models
                        .parameters
                        .iter()
                        .map(|field| (field.key.clone(), field.description.clone()))
                        .collect();
                    (models.selected.clone(), models.description.clone(), fields)
                })
                .dedupe_cloned()
                .map({
                    let columns = columns.clone();
                    move |(selected, description, fields)| {
                        selected.map(|_| selected_model_details(description, fields, columns.clone()))
                    }
                }),
        )
        .item(
            Row::new()
                .s(Gap::new().x(SPACING_8))
                .item(button("Preview", {
                    let model_run_clicked_relay = columns.model_run_clicked_relay.clone();
                    move || model_run_clicked_relay.send(RunMode::Preview)
                }))
                .item(button("Submit", {
                    let model_run_clicked_relay = columns.model_run_clicked_relay.clone();
                    move || model_run_clicked_relay.send(RunMode::Submit)
                })),
        )
}

fn model_row(name: String, selected: bool, columns: ColumnsDomain) -> impl Element {
    let hovered = Mutable::new(false);
    El::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_8).y(6))
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Background::new().color_signal(hovered.signal().map(move |hovered| {
            if selected {
                row_checked()
            } else if hovered {
                row_hover()
            } else {
                panel()
            }
        })))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .on_click({
            let name = name.clone();
            move || columns.model_selected_relay.send(name.clone())
        })
        .child(name)
}

/// Inputs are rebuilt only when the selected model changes, not while typing.
fn selected_model_details(
    description: String,
    fields: Vec<(String, String)>,
    columns: ColumnsDomain,
) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(SPACING_8))
        .item((!description.is_empty()).then(|| muted_text(description)))
        .items(
            fields
                .into_iter()
                .map(|(key, description)| parameter_input(key, description, columns.clone())),
        )
}

fn parameter_input(key: String, description: String, columns: ColumnsDomain) -> impl Element {
    let value_key = key.clone();
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(SPACING_4))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_12).weight(FontWeight::SemiBold).color(text()))
                .child(key.clone()),
        )
        .item(
            TextInput::new()
                .s(Width::fill())
                .s(Padding::new().x(SPACING_8).y(4))
                .s(Font::new().size(FONT_SIZE_14).color(text()))
                .s(Borders::all(Border::new().width(1).color(border())))
                .s(RoundedCorners::all(CORNER_RADIUS_4))
                .label_hidden(key.clone())
                .placeholder(Placeholder::new(description))
                .text_signal(columns.snapshot.signal_ref(move |snapshot| {
                    snapshot
                        .models
                        .parameters
                        .iter()
                        .find(|field: &&ParameterField| field.key == value_key)
                        .map(|field| field.value.clone())
                        .unwrap_or_default()
                }))
                .on_change(move |text| columns.model_parameter_changed_relay.send((key.clone(), text))),
        )
}

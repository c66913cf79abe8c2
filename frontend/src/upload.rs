use crate::columns::{ColumnsDomain, PickedUpload};
use crate::dataflow::Relay;
use crate::error_display::ErrorAlert;
use crate::theme::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use zoon::events::Change;
use zoon::*;

const ACCEPTED_TABLES: &str = ".csv,.tsv,.txt,.xls,.xlsx";

/// A label wrapping a hidden file input, so the whole button opens the browser's file chooser.
pub fn upload_button(columns: ColumnsDomain, toasts: Relay<ErrorAlert>) -> impl Element {
    let hovered = Mutable::new(false);
    El::new()
        .s(Padding::new().x(SPACING_12).y(6))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(hovered.signal().map_bool(row_hover, panel)))
        .s(Cursor::new(CursorIcon::Pointer))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .child(
            RawHtmlEl::new("label")
                .style("cursor", "pointer")
                .child("Upload Table")
                .child(file_input(columns, toasts)),
        )
}

fn file_input(columns: ColumnsDomain, toasts: Relay<ErrorAlert>) -> RawHtmlEl<web_sys::HtmlElement> {
    RawHtmlEl::new("input")
        .attr("type", "file")
        .attr("accept", ACCEPTED_TABLES)
        .style("display", "none")
        .event_handler(move |event: Change| {
            let Some(input) = event
                .target()
                .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
            else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            // Cleared so that picking the same file again still fires a change.
            input.set_value("");

            let upload_selected_relay = columns.upload_selected_relay.clone();
            let toasts = toasts.clone();
            Task::start(async move {
                let file_name = file.name();
                match read_file(&file).await {
                    Ok(bytes) => upload_selected_relay.send(PickedUpload { file_name, bytes }),
                    Err(error) => toasts.send(ErrorAlert::new_upload_error(&file_name, error)),
                }
            });
        })
}

async fn read_file(file: &web_sys::File) -> Result<Vec<u8>, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|error| format!("{error:?}"))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

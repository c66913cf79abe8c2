//! TableScopeApp - domain wiring and root layout

use crate::columns::ColumnsDomain;
use crate::connection::{Outgoing, create_connection_message_handler, new_client_id, start_outbox};
use crate::dataflow::{Actor, relay};
use crate::error_display::ErrorDisplay;
use crate::error_ui::toast_notifications_container;
use crate::file_picker::{FilePickerDomain, file_library_dialog};
use crate::theme::background;
use crate::views::{content_area, toolbar};
use shared::UpMsg;
use std::rc::Rc;
use zoon::*;

pub struct TableScopeApp {
    pub error_display: ErrorDisplay,
    pub columns: ColumnsDomain,
    pub file_picker: FilePickerDomain,
    message_handler: Actor<()>,
    outbox_task: TaskHandle,
}

impl TableScopeApp {
    pub fn new() -> Self {
        let error_display = ErrorDisplay::new();

        // Domains queue requests before the connection exists; the outbox drains them once it does.
        let (outbox_relay, outbox_stream) = relay::<Outgoing>();
        let columns = ColumnsDomain::new(outbox_relay.clone(), error_display.toast_added_relay.clone());
        let file_picker = FilePickerDomain::new(outbox_relay, columns.library_file_picked_relay.clone());

        let (connection, message_handler) =
            create_connection_message_handler(&columns, &file_picker, &error_display);
        let connection = Rc::new(connection);
        let outbox_task = start_outbox(connection.clone(), new_client_id(), outbox_stream);

        Task::start(async move { connection.send_up_msg(UpMsg::LoadConfig).await });

        Self {
            error_display,
            columns,
            file_picker,
            message_handler,
            outbox_task,
        }
    }

    /// The root element keeps the connection tasks alive for the lifetime of the page.
    pub fn root(self) -> impl Element {
        let Self {
            error_display,
            columns,
            file_picker,
            message_handler,
            outbox_task,
        } = self;
        let toasts = error_display.toast_added_relay.clone();

        Stack::new()
            .s(Width::fill())
            .s(Height::fill())
            .s(Background::new().color(background()))
            .s(Font::new().family([FontFamily::new("Inter"), FontFamily::SansSerif]))
            .layer(
                Column::new()
                    .s(Width::fill())
                    .s(Height::fill())
                    .item(toolbar(columns.clone(), file_picker.clone(), toasts))
                    .item(content_area(columns)),
            )
            .layer(file_library_dialog(file_picker))
            .layer(toast_notifications_container(error_display))
            .after_remove(move |_| drop((message_handler, outbox_task)))
    }
}

//! TableScope Main Entry Point

use std::sync::OnceLock;
use zoon::*;

/// Stores the main application task handle to prevent it from being dropped.
static MAIN_TASK: OnceLock<TaskHandle> = OnceLock::new();

mod app;
mod columns;
mod connection;
mod dataflow;
mod error_display;
mod error_ui;
mod file_picker;
mod model_picker;
mod theme;
mod upload;
mod views;
mod virtual_list;

pub fn main() {
    // The zoon connection expects ReconnectingEventSource; plain EventSource stands in when it is missing.
    ensure_reconnecting_event_source();

    let handle = Task::start_droppable(async {
        let app = crate::app::TableScopeApp::new();
        start_app("app", move || app.root());
    });
    let _ = MAIN_TASK.set(handle);
}

#[wasm_bindgen::prelude::wasm_bindgen(inline_js = r#"
export function ensure_reconnecting_event_source() {
  if (typeof window === 'undefined' || window.ReconnectingEventSource) return;
  window.ReconnectingEventSource = window.EventSource || function (url) {
    this.url = url;
    this.close = () => {};
    this.addEventListener = () => {};
    this.removeEventListener = () => {};
  };
}
"#)]
extern "C" {
    fn ensure_reconnecting_event_source();
}

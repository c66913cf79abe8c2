use crate::dataflow::{ActorVec, Relay, relay};
use futures::{StreamExt, select};
use shared::{SelectionError, WorkflowFailure};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Notification variant for styling different types of toasts
#[derive(Debug, Clone, PartialEq, Copy, Default)]
pub enum NotificationVariant {
    /// Red styling for errors
    #[default]
    Error,
    /// Blue styling for informational messages
    Info,
    /// Green styling for success messages
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAlert {
    pub id: String,
    pub title: String,
    pub message: String,
    /// Raw technical error for console logging
    pub technical_error: String,
    /// 0 keeps the toast until it is dismissed
    pub auto_dismiss_ms: u64,
    pub variant: NotificationVariant,
}

static TOAST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_toast_id(prefix: &str) -> String {
    format!("{prefix}_{}", TOAST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

impl ErrorAlert {
    /// A remote call failed. Transient failures are dismissible, format errors stay.
    pub fn new_workflow_failure(action: &str, failure: &WorkflowFailure) -> Self {
        let title = match failure {
            WorkflowFailure::MalformedResponse(_) => "Data Format Error",
            WorkflowFailure::Config(_) => "Configuration Error",
            WorkflowFailure::Network(_) | WorkflowFailure::Status { .. } => "Request Failed",
        };
        Self {
            id: next_toast_id("workflow_error"),
            title: title.to_string(),
            message: format!("{action}: {}", make_error_user_friendly(failure)),
            technical_error: format!("{action} failed: {failure:?}"),
            auto_dismiss_ms: if failure.is_transient() { 5000 } else { 0 },
            variant: NotificationVariant::Error,
        }
    }

    /// The user asked for something the current selection cannot do. No request was sent.
    pub fn new_selection_error(error: &SelectionError) -> Self {
        Self {
            id: next_toast_id("selection_error"),
            title: "Check Your Selection".to_string(),
            message: error.to_string(),
            technical_error: format!("Selection rejected: {error:?}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn new_config_error(error: String) -> Self {
        Self {
            id: next_toast_id("config_error"),
            title: "Configuration Error".to_string(),
            message: "Server configuration could not be loaded, using defaults.".to_string(),
            technical_error: format!("Config error: {error}"),
            auto_dismiss_ms: 0,
            variant: NotificationVariant::Error,
        }
    }

    pub fn new_upload_error(file_name: &str, error: String) -> Self {
        Self {
            id: next_toast_id("upload_error"),
            title: "Upload Failed".to_string(),
            message: format!("{file_name} could not be read in the browser."),
            technical_error: format!("Reading {file_name}: {error}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn new_info(title: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: next_toast_id("info"),
            title: title.into(),
            technical_error: message.clone(),
            message,
            auto_dismiss_ms: 4000,
            variant: NotificationVariant::Info,
        }
    }

    pub fn new_success(title: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: next_toast_id("success"),
            title: title.into(),
            technical_error: message.clone(),
            message,
            auto_dismiss_ms: 4000,
            variant: NotificationVariant::Success,
        }
    }
}

pub fn make_error_user_friendly(failure: &WorkflowFailure) -> String {
    match failure {
        WorkflowFailure::Network(error) => {
            let error_lower = error.to_lowercase();
            if error_lower.contains("timed out") || error_lower.contains("timeout") {
                "Operation timed out. Please try again.".to_string()
            } else {
                "Connection error. Please check that the workflow service is reachable.".to_string()
            }
        }
        WorkflowFailure::Status { code, .. } if *code == 401 || *code == 403 => {
            "The workflow service rejected the key for this action.".to_string()
        }
        WorkflowFailure::Status { code, .. } if *code >= 500 => {
            format!("The workflow service is unavailable (HTTP {code}). Please try again.")
        }
        WorkflowFailure::Status { code, body } => {
            let body = body.trim();
            if body.is_empty() {
                format!("The workflow service answered HTTP {code}.")
            } else {
                format!("The workflow service answered HTTP {code}: {body}")
            }
        }
        WorkflowFailure::MalformedResponse(_) => {
            "The response had an unexpected format. The current table was kept.".to_string()
        }
        WorkflowFailure::Config(what) => format!("{what}. Ask an administrator to update the server config."),
    }
}

/// Log error to browser console only (no toast notification)
/// Use for background operations or non-user-initiated errors
pub fn log_error_console_only(alert: ErrorAlert) {
    zoon::eprintln!("Error: {}", alert.technical_error);
}

/// Error Display domain using proper Actor+Relay architecture
#[derive(Clone)]
pub struct ErrorDisplay {
    pub active_toasts: ActorVec<ErrorAlert>,
    pub toast_added_relay: Relay<ErrorAlert>,
    pub toast_dismissed_relay: Relay<String>,
}

impl ErrorDisplay {
    pub fn new() -> Self {
        let (toast_added_relay, mut toast_added_stream) = relay::<ErrorAlert>();
        let (toast_dismissed_relay, mut toast_dismissed_stream) = relay::<String>();

        let active_toasts = ActorVec::new(vec![], async move |toasts| {
            loop {
                select! {
                    alert = toast_added_stream.next() => {
                        if let Some(alert) = alert {
                            zoon::println!("{}: {}", alert.title, alert.technical_error);
                            let mut toasts = toasts.lock_mut();
                            toasts.retain(|existing| existing.id != alert.id);
                            toasts.push_cloned(alert);
                        }
                    }
                    dismissed_id = toast_dismissed_stream.next() => {
                        if let Some(id) = dismissed_id {
                            toasts.lock_mut().retain(|alert| alert.id != id);
                        }
                    }
                    complete => break,
                }
            }
        });

        Self {
            active_toasts,
            toast_added_relay,
            toast_dismissed_relay,
        }
    }

    pub fn show(&self, alert: ErrorAlert) {
        self.toast_added_relay.send(alert);
    }

    pub fn dismiss(&self, id: &str) {
        self.toast_dismissed_relay.send(id.to_string());
    }
}

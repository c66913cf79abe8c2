use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod explorer;
pub mod models;
pub mod observable;
pub mod pagination;
pub mod picker;
pub mod request;
pub mod row;
pub mod selection;
pub mod time;
pub mod view;
pub mod viewport;
pub mod workflow;

pub use config::{AppConfig, ClientConfig, ModelInfo, UiSection};
pub use error::{SelectionError, ViewportError, WorkflowFailure};
pub use request::RequestId;
pub use row::{Row, RowSet};
pub use workflow::{ModelRunRequest, ReportRequest, RunMode, UploadResponse, WorkflowCall, WorkflowOutcome};

/// Identifies one browser tab; requests are tracked per client for cancellation.
pub type ClientId = String;

// ===== MESSAGE TYPES =====

#[derive(Serialize, Deserialize, Debug)]
pub enum UpMsg {
    LoadConfig,
    Run {
        client: ClientId,
        request: RequestId,
        call: WorkflowCall,
    },
    Cancel {
        client: ClientId,
        request: RequestId,
    },
}

#[derive(Serialize, Deserialize, Debug)]
pub enum DownMsg {
    ConfigLoaded(ClientConfig),
    ConfigError(String),
    Completed {
        request: RequestId,
        outcome: WorkflowOutcome,
    },
    Failed {
        request: RequestId,
        failure: WorkflowFailure,
    },
    Cancelled {
        request: RequestId,
    },
}

impl DownMsg {
    pub fn request(&self) -> Option<RequestId> {
        match self {
            Self::Completed { request, .. } | Self::Failed { request, .. } | Self::Cancelled { request } => {
                Some(*request)
            }
            Self::ConfigLoaded(_) | Self::ConfigError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_message_survives_json() {
        let message = UpMsg::Run {
            client: "tab-1".into(),
            request: RequestId(7),
            call: WorkflowCall::OpenFromLibrary {
                file_name: "sales.csv".into(),
            },
        };

        let json = serde_json::to_string(&message).unwrap();
        let UpMsg::Run { client, request, call } = serde_json::from_str(&json).unwrap() else {
            panic!("expected Run");
        };
        assert_eq!(client, "tab-1");
        assert_eq!(request, RequestId(7));
        assert_eq!(call.label(), "open from library");
    }

    #[test]
    fn down_messages_report_their_request() {
        let failed = DownMsg::Failed {
            request: RequestId(3),
            failure: WorkflowFailure::Network("reset".into()),
        };
        assert_eq!(failed.request(), Some(RequestId(3)));
        assert_eq!(DownMsg::ConfigError("x".into()).request(), None);
    }
}

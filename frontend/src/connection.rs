use crate::columns::ColumnsDomain;
use crate::dataflow::Actor;
use crate::error_display::{ErrorAlert, ErrorDisplay};
use crate::file_picker::FilePickerDomain;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::StreamExt;
use shared::{ClientId, DownMsg, RequestId, UpMsg, WorkflowCall, WorkflowFailure, WorkflowOutcome};
use std::rc::Rc;
use zoon::*;

/// What a domain asks the backend to do.
#[derive(Debug, Clone)]
pub enum Outgoing {
    Run { request: RequestId, call: WorkflowCall },
    Cancel { request: RequestId },
}

/// How a request ended, as seen by the domain that issued it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Completed(WorkflowOutcome),
    Failed(WorkflowFailure),
    Cancelled,
}

impl Reply {
    /// `Ok(None)` for a cancelled request.
    pub fn into_outcome(self) -> Result<Option<WorkflowOutcome>, WorkflowFailure> {
        match self {
            Self::Completed(outcome) => Ok(Some(outcome)),
            Self::Failed(failure) => Err(failure),
            Self::Cancelled => Ok(None),
        }
    }
}

pub fn reply_for(down_msg: DownMsg) -> Option<(RequestId, Reply)> {
    match down_msg {
        DownMsg::Completed { request, outcome } => Some((request, Reply::Completed(outcome))),
        DownMsg::Failed { request, failure } => Some((request, Reply::Failed(failure))),
        DownMsg::Cancelled { request } => Some((request, Reply::Cancelled)),
        DownMsg::ConfigLoaded(_) | DownMsg::ConfigError(_) => None,
    }
}

pub fn up_msg_for(client: &ClientId, outgoing: Outgoing) -> UpMsg {
    match outgoing {
        Outgoing::Run { request, call } => UpMsg::Run {
            client: client.clone(),
            request,
            call,
        },
        Outgoing::Cancel { request } => UpMsg::Cancel {
            client: client.clone(),
            request,
        },
    }
}

/// One id per page load; the backend scopes cancellation by it.
pub fn new_client_id() -> ClientId {
    format!("client-{:016x}", (js_sys::Math::random() * u64::MAX as f64) as u64)
}

/// Actor+Relay compatible Connection adapter
pub struct ConnectionAdapter {
    connection: Connection<UpMsg, DownMsg>,
}

impl ConnectionAdapter {
    pub fn new() -> (Self, impl futures::stream::Stream<Item = DownMsg>) {
        let (message_sender, message_stream) = futures::channel::mpsc::unbounded();

        let connection = Connection::new(move |down_msg, _| {
            let _ = message_sender.unbounded_send(down_msg);
        });

        let adapter = ConnectionAdapter { connection };
        (adapter, message_stream)
    }

    pub async fn send_up_msg(&self, up_msg: UpMsg) {
        if let Err(error) = self.connection.send_up_msg(up_msg).await {
            zoon::eprintln!("Failed to send message: {:?}", error);
        }
    }
}

/// Routes every DownMsg to the domains. Each domain ignores request ids it did not issue.
pub fn create_connection_message_handler(
    columns: &ColumnsDomain,
    file_picker: &FilePickerDomain,
    error_display: &ErrorDisplay,
) -> (ConnectionAdapter, Actor<()>) {
    let (connection_adapter, mut down_msg_stream) = ConnectionAdapter::new();

    let columns = columns.clone();
    let file_picker = file_picker.clone();
    let error_display = error_display.clone();

    let message_handler = Actor::new((), async move |_state| {
        while let Some(down_msg) = down_msg_stream.next().await {
            handle_down_msg(down_msg, &columns, &file_picker, &error_display);
        }
    });

    (connection_adapter, message_handler)
}

fn handle_down_msg(
    down_msg: DownMsg,
    columns: &ColumnsDomain,
    file_picker: &FilePickerDomain,
    error_display: &ErrorDisplay,
) {
    match down_msg {
        DownMsg::ConfigLoaded(config) => {
            zoon::println!("Config loaded: {} models", config.models.len());
            file_picker.config_loaded_relay.send(config.clone());
            columns.config_loaded_relay.send(config);
        }
        DownMsg::ConfigError(error) => {
            error_display.show(ErrorAlert::new_config_error(error));
        }
        down_msg => {
            if let Some((request, reply)) = reply_for(down_msg) {
                file_picker.reply_received_relay.send((request, reply.clone()));
                columns.reply_received_relay.send((request, reply));
            }
        }
    }
}

/// Drains the domains' outbox into the connection.
///
/// Every message goes out on its own task so a cancel is not queued behind the
/// request it cancels.
pub fn start_outbox(
    connection: Rc<ConnectionAdapter>,
    client: ClientId,
    mut outbox_stream: UnboundedReceiver<Outgoing>,
) -> TaskHandle {
    Task::start_droppable(async move {
        while let Some(outgoing) = outbox_stream.next().await {
            let connection = connection.clone();
            let up_msg = up_msg_for(&client, outgoing);
            Task::start(async move { connection.send_up_msg(up_msg).await });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_keep_their_request_id() {
        let (request, reply) = reply_for(DownMsg::Failed {
            request: RequestId(7),
            failure: WorkflowFailure::Network("refused".into()),
        })
        .unwrap();
        assert_eq!(request, RequestId(7));
        assert_eq!(reply, Reply::Failed(WorkflowFailure::Network("refused".into())));

        assert!(reply_for(DownMsg::ConfigError("bad".into())).is_none());
    }

    #[test]
    fn cancelled_reply_has_no_outcome() {
        assert_eq!(Reply::Cancelled.into_outcome(), Ok(None));
        assert_eq!(
            Reply::Completed(WorkflowOutcome::TaskDropped).into_outcome(),
            Ok(Some(WorkflowOutcome::TaskDropped))
        );
    }

    #[test]
    fn outgoing_carries_the_client_id() {
        let client: ClientId = "client-1".into();
        match up_msg_for(&client, Outgoing::Cancel { request: RequestId(3) }) {
            UpMsg::Cancel { client, request } => {
                assert_eq!(client, "client-1");
                assert_eq!(request, RequestId(3));
            }
            other => panic!("unexpected {other:?}"),
        }
        match up_msg_for(&client, Outgoing::Run { request: RequestId(4), call: WorkflowCall::ListFiles }) {
            UpMsg::Run { request, call, .. } => {
                assert_eq!(request, RequestId(4));
                assert!(matches!(call, WorkflowCall::ListFiles));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

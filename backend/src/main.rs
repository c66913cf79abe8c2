use moon::*;
use shared::{AppConfig, DownMsg, UpMsg, WorkflowCall, WorkflowFailure};
use std::sync::RwLock;

mod config;
mod requests;
mod workflow;

use requests::{CallResult, InFlight};
use workflow::WorkflowClient;

static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| RwLock::new(AppConfig::default()));
static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);
static IN_FLIGHT: Lazy<InFlight> = Lazy::new(InFlight::new);

async fn frontend() -> Frontend {
    Frontend::new().title("TableScope").index_by_robots(false)
}

async fn up_msg_handler(req: UpMsgRequest<UpMsg>) {
    let (session_id, cor_id) = (req.session_id, req.cor_id);

    match req.up_msg {
        UpMsg::LoadConfig => {
            load_config(session_id, cor_id).await;
        }
        UpMsg::Run { client, request, call } => {
            let label = call.label();
            tracing::info!(%client, %request, call = label, "workflow call");
            let msg = match run_call(client.clone(), request, call).await {
                CallResult::Finished(Ok(outcome)) => DownMsg::Completed { request, outcome },
                CallResult::Finished(Err(error)) => {
                    tracing::warn!(%client, %request, call = label, %error, "workflow call failed");
                    DownMsg::Failed {
                        request,
                        failure: error.into(),
                    }
                }
                CallResult::Cancelled => {
                    tracing::info!(%client, %request, call = label, "workflow call cancelled");
                    DownMsg::Cancelled { request }
                }
                CallResult::Panicked(detail) => {
                    tracing::error!(%client, %request, call = label, %detail, "workflow task panicked");
                    DownMsg::Failed {
                        request,
                        failure: WorkflowFailure::Network(detail),
                    }
                }
            };
            send_down_msg(msg, session_id, cor_id).await;
        }
        UpMsg::Cancel { client, request } => {
            if !IN_FLIGHT.cancel(&client, request) {
                tracing::debug!(%client, %request, "cancel for a call that is no longer running");
            }
        }
    }
}

async fn run_call(
    client: shared::ClientId,
    request: shared::RequestId,
    call: WorkflowCall,
) -> CallResult<Result<shared::WorkflowOutcome, workflow::WorkflowError>> {
    let config = current_config();
    let workflow = WorkflowClient::new(HTTP.clone(), config);
    IN_FLIGHT
        .run(client, request, async move { workflow.execute(call).await })
        .await
}

fn current_config() -> AppConfig {
    match APP_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn store_config(config: AppConfig) {
    match APP_CONFIG.write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Re-reads the file on every request so edits apply without a restart.
async fn load_config(session_id: SessionId, cor_id: CorId) {
    let msg = match config::load_or_create(config::default_path()) {
        Ok(config) => {
            let client_config = config.client_config();
            store_config(config);
            DownMsg::ConfigLoaded(client_config)
        }
        Err(error) => {
            tracing::error!(%error, "config not loaded");
            DownMsg::ConfigError(error.to_string())
        }
    };
    send_down_msg(msg, session_id, cor_id).await;
}

async fn send_down_msg(msg: DownMsg, session_id: SessionId, cor_id: CorId) {
    if let Some(session) = sessions::by_session_id().wait_for(session_id).await {
        session.send_down_msg(&msg, cor_id).await;
    } else {
        tracing::debug!("session gone before the reply was sent");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();
}

#[moon::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!("backend panic: {panic_info}");
    }));

    match config::load_or_create(config::default_path()) {
        Ok(config) => store_config(config),
        Err(error) => tracing::warn!(%error, "starting with default config"),
    }

    start(frontend, up_msg_handler, |_error| {}).await
}

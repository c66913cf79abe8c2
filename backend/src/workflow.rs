//! HTTP client for the remote workflow engine.
//!
//! Two services are involved: the workflow runner (`{host}/v1/workflows/run`,
//! one bearer key per workflow) and the table service (`{pandas_url}/pandas/*`)
//! which parses uploads and renders charts.

use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use shared::config::WorkflowSection;
use shared::workflow::{
    self, ModelRunRequest, ReportRequest, RunMode, WorkflowCall, WorkflowOutcome,
};
use shared::{AppConfig, WorkflowFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Malformed(WorkflowFailure),
    #[error("{0} is not configured")]
    MissingKey(String),
}

impl From<WorkflowError> for WorkflowFailure {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::Http(error) if error.is_decode() => Self::MalformedResponse(error.to_string()),
            WorkflowError::Http(error) => Self::Network(error.to_string()),
            WorkflowError::Status { status, body } => Self::Status { code: status, body },
            WorkflowError::Json(error) => Self::MalformedResponse(error.to_string()),
            WorkflowError::Malformed(failure) => failure,
            WorkflowError::MissingKey(what) => Self::Config(format!("{what} is not configured")),
        }
    }
}

impl From<WorkflowFailure> for WorkflowError {
    fn from(failure: WorkflowFailure) -> Self {
        Self::Malformed(failure)
    }
}

/// Body of a blocking workflow run.
pub fn run_body(inputs: Value, user: &str) -> Value {
    json!({
        "inputs": inputs,
        "user": user,
        "response_mode": "blocking",
    })
}

/// The engine expects the column list as a JSON-encoded string.
pub fn encode_columns(columns: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(columns)
}

pub fn report_body(request: &ReportRequest) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "task_id": request.task_id,
        "col": encode_columns(&request.columns)?,
        "start_time": request.start_time,
        "end_time": request.end_time,
        "response_mode": "blocking",
    }))
}

pub fn model_inputs(request: &ModelRunRequest) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "task_id": request.task_id,
        "col": encode_columns(&request.columns)?,
        "parameters": serde_json::to_string(&request.parameters)?,
        "start_time": request.start_time,
        "end_time": request.end_time,
    }))
}

pub struct WorkflowClient {
    http: reqwest::Client,
    config: AppConfig,
}

impl WorkflowClient {
    pub fn new(http: reqwest::Client, config: AppConfig) -> Self {
        Self { http, config }
    }

    fn section(&self) -> &WorkflowSection {
        &self.config.workflow
    }

    fn key<'a>(key: &'a str, what: &str) -> Result<&'a str, WorkflowError> {
        if key.trim().is_empty() {
            return Err(WorkflowError::MissingKey(what.to_string()));
        }
        Ok(key)
    }

    pub async fn execute(&self, call: WorkflowCall) -> Result<WorkflowOutcome, WorkflowError> {
        let keys = &self.section().keys;
        match call {
            WorkflowCall::UploadTable { file_name, bytes } => {
                let upload = self.upload(file_name, bytes).await?;
                Ok(WorkflowOutcome::TableLoaded(upload))
            }
            WorkflowCall::ListFiles => {
                let key = Self::key(&keys.list_files, "workflow.keys.list_files")?;
                let body = self.run_workflow(key, json!({})).await?;
                let rows = workflow::parse_file_list(workflow::workflow_outputs(&body)?)?;
                Ok(WorkflowOutcome::FileList(rows))
            }
            WorkflowCall::OpenFromLibrary { file_name } => {
                let key = Self::key(&keys.open_file, "workflow.keys.open_file")?;
                let body = self.run_workflow(key, json!({ "file_name": file_name })).await?;
                Ok(workflow::parse_library_entry(workflow::workflow_outputs(&body)?)?)
            }
            WorkflowCall::SaveToLibrary { file_name, task_id } => {
                let key = Self::key(&keys.save_file, "workflow.keys.save_file")?;
                self.run_workflow(key, json!({ "save_name": file_name, "task_id": task_id }))
                    .await?;
                Ok(WorkflowOutcome::Saved { file_name })
            }
            WorkflowCall::RenderReport(request) => {
                let url = self.render_report(&request).await?;
                Ok(WorkflowOutcome::Report { url })
            }
            WorkflowCall::RunModel(request) => self.run_model(&request).await,
            WorkflowCall::DropTask { task_id } => {
                let key = Self::key(&keys.drop_task, "workflow.keys.drop_task")?;
                self.run_workflow(key, json!({ "task_id": task_id })).await?;
                Ok(WorkflowOutcome::TaskDropped)
            }
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, WorkflowError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn run_workflow(&self, key: &str, inputs: Value) -> Result<Value, WorkflowError> {
        let section = self.section();
        let url = format!("{}/v1/workflows/run", section.host);
        tracing::debug!(%url, "running workflow");
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&run_body(inputs, &section.user))
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn upload(&self, file_name: String, bytes: Vec<u8>) -> Result<shared::UploadResponse, WorkflowError> {
        let url = format!("{}/pandas/read", self.section().pandas_url);
        tracing::info!(%url, file = %file_name, size = bytes.len(), "uploading table");
        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        Ok(workflow::parse_upload(body)?)
    }

    async fn render_report(&self, request: &ReportRequest) -> Result<String, WorkflowError> {
        let url = format!("{}/pandas/plot", self.section().pandas_url);
        tracing::info!(%url, columns = request.columns.len(), "rendering report");
        let response = self.http.post(&url).json(&report_body(request)?).send().await?;
        let body = Self::read_json(response).await?;
        Ok(workflow::parse_report(&body)?)
    }

    async fn run_model(&self, request: &ModelRunRequest) -> Result<WorkflowOutcome, WorkflowError> {
        let model = self
            .config
            .model(&request.model)
            .ok_or_else(|| WorkflowError::MissingKey(format!("model '{}'", request.model)))?;
        let key = match request.mode {
            RunMode::Preview => Self::key(&model.preview_key, "model preview key")?,
            RunMode::Submit => Self::key(&model.submit_key, "model submit key")?,
        };
        tracing::info!(model = %model.name, mode = ?request.mode, "running model");
        let body = self.run_workflow(key, model_inputs(request)?).await?;
        Ok(workflow::parse_model_output(
            workflow::workflow_outputs(&body)?,
            request.mode,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_request(pairs: &[(&str, &str)]) -> ModelRunRequest {
        ModelRunRequest {
            model: "Trend".into(),
            mode: RunMode::Submit,
            task_id: "t1".into(),
            columns: vec!["a".into(), "b".into()],
            parameters: pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            start_time: "2024-01-01".into(),
            end_time: "2024-02-01".into(),
        }
    }

    #[test]
    fn run_body_is_blocking() {
        let body = run_body(json!({ "task_id": "t1" }), "admin");
        assert_eq!(body["response_mode"], "blocking");
        assert_eq!(body["user"], "admin");
        assert_eq!(body["inputs"]["task_id"], "t1");
    }

    #[test]
    fn report_body_encodes_columns_as_string() {
        let body = report_body(&ReportRequest {
            task_id: "t1".into(),
            columns: vec!["temp".into(), "pressure".into()],
            start_time: "2024-01-01".into(),
            end_time: "2024-01-31".into(),
        })
        .unwrap();

        assert_eq!(body["col"], r#"["temp","pressure"]"#);
        assert_eq!(body["end_time"], "2024-01-31");
    }

    #[test]
    fn model_inputs_keep_parameter_order() {
        let inputs = model_inputs(&model_request(&[("window", "3"), ("alpha", "0.5")])).unwrap();
        assert_eq!(inputs["parameters"], r#"{"window":"3","alpha":"0.5"}"#);
        assert_eq!(inputs["col"], r#"["a","b"]"#);
    }

    #[test]
    fn errors_map_to_wire_failures() {
        let status: WorkflowFailure = WorkflowError::Status {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_eq!(status, WorkflowFailure::Status { code: 503, body: "busy".into() });

        let json: WorkflowFailure = WorkflowError::from(serde_json::from_str::<Value>("{").unwrap_err()).into();
        assert!(matches!(json, WorkflowFailure::MalformedResponse(_)));

        let missing: WorkflowFailure = WorkflowError::MissingKey("workflow.keys.list_files".into()).into();
        assert!(matches!(missing, WorkflowFailure::Config(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = WorkflowClient::new(reqwest::Client::new(), AppConfig::default());
        let error = client.execute(WorkflowCall::ListFiles).await.unwrap_err();
        assert!(matches!(error, WorkflowError::MissingKey(_)));

        let error = client
            .execute(WorkflowCall::RunModel(model_request(&[])))
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::MissingKey(_)));
    }
}

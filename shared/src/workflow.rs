//! Calls the frontend can ask for and the payload shapes of the remote workflow engine.

use crate::error::WorkflowFailure;
use crate::row::{MISSING_FIELD, Row};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum WorkflowCall {
    UploadTable { file_name: String, bytes: Vec<u8> },
    ListFiles,
    OpenFromLibrary { file_name: String },
    SaveToLibrary { file_name: String, task_id: String },
    RenderReport(ReportRequest),
    RunModel(ModelRunRequest),
    DropTask { task_id: String },
}

impl WorkflowCall {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UploadTable { .. } => "upload",
            Self::ListFiles => "list files",
            Self::OpenFromLibrary { .. } => "open from library",
            Self::SaveToLibrary { .. } => "save to library",
            Self::RenderReport(_) => "render report",
            Self::RunModel(_) => "run model",
            Self::DropTask { .. } => "drop task",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    TableLoaded(UploadResponse),
    FileList(Vec<Row>),
    /// Library entry that is a plain file; the browser downloads it.
    Download { url: String },
    Saved { file_name: String },
    Report { url: String },
    ModelPreview { url: String },
    ModelSubmitted { output: String },
    TaskDropped,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub task_id: String,
    pub columns: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Preview,
    Submit,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelRunRequest {
    pub model: String,
    pub mode: RunMode,
    pub task_id: String,
    pub columns: Vec<String>,
    pub parameters: IndexMap<String, String>,
    pub start_time: String,
    pub end_time: String,
}

/// Result of parsing an uploaded table, also embedded in library entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(default)]
    pub url: String,
    pub task_id: String,
    #[serde(default)]
    pub is_tmp: bool,
    #[serde(default)]
    pub origin_fn: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub result: TableMeta,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMeta {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub index_range: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct FilesMeta {
    #[serde(default)]
    name: Vec<String>,
    #[serde(default)]
    size: Vec<Value>,
    #[serde(default)]
    modified: Vec<Value>,
}

fn malformed(detail: impl Into<String>) -> WorkflowFailure {
    WorkflowFailure::MalformedResponse(detail.into())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) if text.is_empty() => MISSING_FIELD.to_string(),
        Value::String(text) => text.clone(),
        Value::Null => MISSING_FIELD.to_string(),
        other => other.to_string(),
    }
}

/// Pulls `data.outputs` out of a blocking workflow run response.
pub fn workflow_outputs(body: &Value) -> Result<&Value, WorkflowFailure> {
    body.get("data")
        .and_then(|data| data.get("outputs"))
        .ok_or_else(|| malformed("response has no data.outputs"))
}

/// The file list arrives as a JSON-encoded string in `outputs.files_meta`.
pub fn parse_file_list(outputs: &Value) -> Result<Vec<Row>, WorkflowFailure> {
    let meta: FilesMeta = match outputs.get("files_meta") {
        Some(Value::String(encoded)) => {
            serde_json::from_str(encoded).map_err(|error| malformed(format!("files_meta: {error}")))?
        }
        Some(object @ Value::Object(_)) => {
            serde_json::from_value(object.clone()).map_err(|error| malformed(format!("files_meta: {error}")))?
        }
        _ => return Err(malformed("outputs has no files_meta")),
    };

    Ok(meta
        .name
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let size = meta.size.get(index).map(display_value);
            let modified = meta.modified.get(index).map(display_value);
            Row::file(
                name.clone(),
                size.unwrap_or_else(|| MISSING_FIELD.to_string()),
                modified.unwrap_or_else(|| MISSING_FIELD.to_string()),
            )
        })
        .collect())
}

pub fn is_download_url(text: &str) -> bool {
    let text = text.trim();
    text.starts_with("http://") || text.starts_with("https://")
}

/// A library entry is either a table the engine re-parsed or a file to download.
pub fn parse_library_entry(outputs: &Value) -> Result<WorkflowOutcome, WorkflowFailure> {
    let entry = outputs
        .get("meta")
        .or_else(|| outputs.get("result"))
        .ok_or_else(|| malformed("outputs has no meta"))?;

    match entry {
        Value::String(text) if is_download_url(text) => Ok(WorkflowOutcome::Download {
            url: text.trim().to_string(),
        }),
        Value::String(text) => serde_json::from_str(text)
            .map(WorkflowOutcome::TableLoaded)
            .map_err(|error| malformed(format!("library entry: {error}"))),
        object @ Value::Object(_) => serde_json::from_value(object.clone())
            .map(WorkflowOutcome::TableLoaded)
            .map_err(|error| malformed(format!("library entry: {error}"))),
        _ => Err(malformed("library entry is neither a URL nor a table")),
    }
}

pub fn parse_upload(body: Value) -> Result<UploadResponse, WorkflowFailure> {
    serde_json::from_value(body).map_err(|error| malformed(format!("upload response: {error}")))
}

/// Submitted runs return a CSV link when they produce one, otherwise free-form metadata.
pub fn parse_model_output(outputs: &Value, mode: RunMode) -> Result<WorkflowOutcome, WorkflowFailure> {
    let text = |key: &str| outputs.get(key).map(display_value);
    match mode {
        RunMode::Preview => text("pdf_url")
            .map(|url| WorkflowOutcome::ModelPreview { url })
            .ok_or_else(|| malformed("outputs has no pdf_url")),
        RunMode::Submit => text("csv_url")
            .or_else(|| text("meta"))
            .map(|output| WorkflowOutcome::ModelSubmitted { output })
            .ok_or_else(|| malformed("outputs has neither csv_url nor meta")),
    }
}

/// The plot endpoint answers `{ "data": { "output": "<url>" } }`.
pub fn parse_report(body: &Value) -> Result<String, WorkflowFailure> {
    body.get("data")
        .and_then(|data| data.get("output"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed("response has no data.output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_list_is_zipped_from_encoded_string() {
        let outputs = json!({
            "files_meta": r#"{"name":["a.csv","b.xlsx"],"size":["12KB"],"modified":["2024-01-01","2024-01-02"]}"#
        });

        let rows = parse_file_list(&outputs).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].size.as_deref(), Some("12KB"));
        assert_eq!(rows[1].size.as_deref(), Some(MISSING_FIELD));
        assert_eq!(rows[1].modified.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn numeric_sizes_are_displayed() {
        let outputs = json!({ "files_meta": { "name": ["a"], "size": [2048], "modified": [null] } });
        let rows = parse_file_list(&outputs).unwrap();
        assert_eq!(rows[0].size.as_deref(), Some("2048"));
        assert_eq!(rows[0].modified.as_deref(), Some(MISSING_FIELD));
    }

    #[test]
    fn missing_files_meta_is_a_format_error() {
        let error = parse_file_list(&json!({})).unwrap_err();
        assert!(matches!(error, WorkflowFailure::MalformedResponse(_)));

        let broken = parse_file_list(&json!({ "files_meta": "{not json" })).unwrap_err();
        assert!(matches!(broken, WorkflowFailure::MalformedResponse(_)));
    }

    #[test]
    fn upload_response_defaults_optional_fields() {
        let upload = parse_upload(json!({
            "task_id": "t1",
            "result": { "columns": ["a", "b"], "index_range": ["2024-01-01", "2024-03-01"] }
        }))
        .unwrap();

        assert_eq!(upload.task_id, "t1");
        assert!(!upload.is_tmp);
        assert_eq!(upload.origin_fn, None);
        assert_eq!(upload.result.columns, ["a", "b"]);
    }

    #[test]
    fn library_entry_url_becomes_download() {
        let outcome = parse_library_entry(&json!({ "meta": "https://files.example/report.pdf" })).unwrap();
        assert_eq!(
            outcome,
            WorkflowOutcome::Download {
                url: "https://files.example/report.pdf".into()
            }
        );
    }

    #[test]
    fn library_entry_json_string_becomes_table() {
        let encoded = json!({
            "url": "u", "task_id": "t9", "is_tmp": true, "origin_fn": "orig.csv", "file_name": "f.csv",
            "result": { "columns": ["x"], "index_range": [] }
        })
        .to_string();

        let outcome = parse_library_entry(&json!({ "meta": encoded })).unwrap();
        let WorkflowOutcome::TableLoaded(table) = outcome else {
            panic!("expected table");
        };
        assert_eq!(table.task_id, "t9");
        assert!(table.is_tmp);
        assert_eq!(table.origin_fn.as_deref(), Some("orig.csv"));
    }

    #[test]
    fn submit_prefers_csv_url_over_meta() {
        let with_csv = parse_model_output(&json!({ "csv_url": "https://x/out.csv", "meta": "m" }), RunMode::Submit);
        let with_meta = parse_model_output(&json!({ "meta": "rows: 4" }), RunMode::Submit);

        assert_eq!(with_csv.unwrap(), WorkflowOutcome::ModelSubmitted { output: "https://x/out.csv".into() });
        assert_eq!(with_meta.unwrap(), WorkflowOutcome::ModelSubmitted { output: "rows: 4".into() });
        assert!(parse_model_output(&json!({}), RunMode::Preview).is_err());
    }

    #[test]
    fn outputs_and_report_are_extracted() {
        let run = json!({ "data": { "outputs": { "pdf_url": "p" } } });
        assert_eq!(workflow_outputs(&run).unwrap()["pdf_url"], "p");
        assert!(workflow_outputs(&json!({ "data": {} })).is_err());

        let plot = json!({ "data": { "output": "https://x/chart.pdf" } });
        assert_eq!(parse_report(&plot).unwrap(), "https://x/chart.pdf");
    }
}

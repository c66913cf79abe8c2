//! `tablescope.toml` layout.
//!
//! The backend owns the whole [`AppConfig`] including workflow keys; the frontend
//! only ever sees the key-free [`ClientConfig`].

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::viewport::{DEFAULT_ITEM_HEIGHT, DEFAULT_OVERSCAN};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "tablescope.toml";
pub const DEFAULT_MAX_SELECTED_COLUMNS: usize = 500;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub workflow: WorkflowSection,
    pub ui: UiSection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSection {
    pub version: String,
}

impl AppSection {
    pub const CURRENT_VERSION: &'static str = "1.0.0";

    pub fn is_supported_version(&self) -> bool {
        self.version == Self::CURRENT_VERSION
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkflowSection {
    /// Base URL of the workflow runner, e.g. `http://10.0.0.5`.
    pub host: String,
    pub user: String,
    /// Base URL of the table parsing and plotting service.
    pub pandas_url: String,
    pub keys: WorkflowKeys,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_string(),
            user: "admin".to_string(),
            pandas_url: "http://localhost:10600".to_string(),
            keys: WorkflowKeys::default(),
        }
    }
}

/// Bearer keys, one per workflow. Empty means "not configured".
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct WorkflowKeys {
    pub list_files: String,
    pub open_file: String,
    pub save_file: String,
    pub drop_task: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiSection {
    pub page_size: usize,
    pub item_height: f64,
    pub viewport_height: f64,
    pub overscan: usize,
    pub max_selected_columns: usize,
    pub search_debounce_ms: u32,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            item_height: DEFAULT_ITEM_HEIGHT,
            viewport_height: 400.0,
            overscan: DEFAULT_OVERSCAN,
            max_selected_columns: DEFAULT_MAX_SELECTED_COLUMNS,
            search_debounce_ms: 300,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelParameter {
    pub value: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preview_key: String,
    #[serde(default)]
    pub submit_key: String,
    #[serde(default)]
    pub parameters: IndexMap<String, ModelParameter>,
}

/// Catalog entry as the browser sees it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub parameters: IndexMap<String, ModelParameter>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub ui: UiSection,
    pub models: Vec<ModelInfo>,
}

impl AppConfig {
    /// Clamps values that would break the list views. Returns one warning per fix.
    pub fn validate_and_fix(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let defaults = UiSection::default();

        if !self.app.is_supported_version() {
            warnings.push(format!(
                "Config version '{}' is not supported, using {}",
                self.app.version,
                AppSection::CURRENT_VERSION
            ));
            self.app = AppSection::default();
        }

        if self.ui.page_size == 0 {
            warnings.push(format!("ui.page_size must be at least 1, using {}", defaults.page_size));
            self.ui.page_size = defaults.page_size;
        }
        if !(self.ui.item_height.is_finite() && self.ui.item_height > 0.0) {
            warnings.push(format!("ui.item_height must be positive, using {}", defaults.item_height));
            self.ui.item_height = defaults.item_height;
        }
        if !(self.ui.viewport_height.is_finite() && self.ui.viewport_height > 0.0) {
            warnings.push(format!(
                "ui.viewport_height must be positive, using {}",
                defaults.viewport_height
            ));
            self.ui.viewport_height = defaults.viewport_height;
        }
        if self.ui.max_selected_columns == 0 {
            warnings.push(format!(
                "ui.max_selected_columns must be at least 1, using {}",
                defaults.max_selected_columns
            ));
            self.ui.max_selected_columns = defaults.max_selected_columns;
        }

        let before = self.models.len();
        let mut seen = std::collections::HashSet::new();
        self.models
            .retain(|model| !model.name.trim().is_empty() && seen.insert(model.name.clone()));
        if self.models.len() != before {
            warnings.push(format!(
                "Dropped {} model entries with empty or repeated names",
                before - self.models.len()
            ));
        }

        for (name, host) in [("workflow.host", &mut self.workflow.host), ("workflow.pandas_url", &mut self.workflow.pandas_url)] {
            let trimmed = host.trim_end_matches('/');
            if trimmed.len() != host.len() {
                let fixed = trimmed.to_string();
                warnings.push(format!("{name}: trailing '/' removed"));
                *host = fixed;
            }
        }

        warnings
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            ui: self.ui.clone(),
            models: self
                .models
                .iter()
                .map(|model| ModelInfo {
                    name: model.name.clone(),
                    description: model.description.clone(),
                    parameters: model.parameters.clone(),
                })
                .collect(),
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|model| model.name == name)
    }

    /// Starting point written when no config file exists yet.
    pub fn with_sample_models() -> Self {
        let parameters: IndexMap<String, ModelParameter> = [
            ("window", "3", "Rolling window size"),
            ("threshold", "", "Optional cut-off"),
        ]
        .into_iter()
        .map(|(name, value, description)| {
            (
                name.to_string(),
                ModelParameter {
                    value: value.to_string(),
                    description: description.to_string(),
                },
            )
        })
        .collect();

        let models = ["Linear regression", "Decision tree", "Moving average"]
            .into_iter()
            .map(|name| ModelConfig {
                name: name.to_string(),
                parameters: parameters.clone(),
                ..ModelConfig::default()
            })
            .collect();

        Self {
            models,
            ..Self::default()
        }
    }
}

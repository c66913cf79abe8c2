//! Searchable single-select over the model catalog, with editable parameters.

use crate::config::ModelInfo;
use crate::error::SelectionError;
use crate::explorer::ColumnExplorer;
use crate::view::matches_search;
use crate::workflow::{ModelRunRequest, RunMode};
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct ModelPicker {
    catalog: Vec<ModelInfo>,
    search: String,
    selected: Option<usize>,
    parameters: IndexMap<String, String>,
}

impl ModelPicker {
    pub fn new(catalog: Vec<ModelInfo>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn set_catalog(&mut self, catalog: Vec<ModelInfo>) {
        let previous = self.selected_model().map(|model| model.name.clone());
        self.catalog = catalog;
        self.selected = None;
        self.parameters.clear();
        if let Some(name) = previous {
            self.select(&name);
        }
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Catalog entries matching the search, in catalog order.
    pub fn visible_models(&self) -> Vec<&ModelInfo> {
        let term = self.search.trim().to_lowercase();
        self.catalog
            .iter()
            .filter(|model| matches_search(&model.name, &term))
            .collect()
    }

    /// Selecting a model loads its default parameter values.
    pub fn select(&mut self, name: &str) -> bool {
        let Some(position) = self.catalog.iter().position(|model| model.name == name) else {
            return false;
        };
        self.selected = Some(position);
        self.parameters = self.catalog[position]
            .parameters
            .iter()
            .map(|(key, parameter)| (key.clone(), parameter.value.clone()))
            .collect();
        true
    }

    pub fn selected_model(&self) -> Option<&ModelInfo> {
        self.selected.and_then(|position| self.catalog.get(position))
    }

    /// Unknown parameter names are ignored.
    pub fn set_parameter(&mut self, key: &str, value: &str) -> bool {
        match self.parameters.get_mut(key) {
            Some(current) => {
                *current = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    fn run(&self, explorer: &ColumnExplorer, mode: RunMode) -> Result<ModelRunRequest, SelectionError> {
        let model = self.selected_model().ok_or(SelectionError::NoModel)?;
        let selection = explorer.validate_selection()?;
        Ok(ModelRunRequest {
            model: model.name.clone(),
            mode,
            task_id: selection.task_id,
            columns: selection.columns,
            parameters: self.parameters.clone(),
            start_time: selection.start_time,
            end_time: selection.end_time,
        })
    }

    pub fn preview(&self, explorer: &ColumnExplorer) -> Result<ModelRunRequest, SelectionError> {
        self.run(explorer, RunMode::Preview)
    }

    pub fn submit(&self, explorer: &ColumnExplorer) -> Result<ModelRunRequest, SelectionError> {
        self.run(explorer, RunMode::Submit)
    }
}

use shared::config::CONFIG_FILE_NAME;
use shared::AppConfig;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
}

pub fn default_path() -> &'static Path {
    Path::new(CONFIG_FILE_NAME)
}

/// Reads the config, creating a default file when none exists.
///
/// Values fixed by validation are written back so the file matches what runs.
pub fn load_or_create(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            let mut config = AppConfig::with_sample_models();
            config.validate_and_fix();
            save(path, &config)?;
            tracing::info!(path = %path.display(), "created default config");
            return Ok(config);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let mut config: AppConfig = toml::from_str(&content)?;
    let warnings = config.validate_and_fix();
    if !warnings.is_empty() {
        for warning in &warnings {
            tracing::warn!(path = %path.display(), "{warning}");
        }
        if let Err(error) = save(path, &config) {
            tracing::warn!(%error, "fixed config kept in memory only");
        }
    }
    Ok(config)
}

pub fn save(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let toml_content = toml::to_string_pretty(config)?;
    let content = format!(
        "# TableScope configuration\n\
         # Workflow endpoints, per-workflow keys, list settings and the model catalog\n\
         \n\
         {toml_content}"
    );
    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

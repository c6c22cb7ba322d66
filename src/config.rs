use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::info;

use crate::error::{DemandError, Result};
use crate::loader::{DataSource, SourceLayout};
use crate::model::{DEFAULT_CATALOG, DEFAULT_DATE_COLUMN};

pub const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "MEDICINE_DEMAND";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    #[serde(default = "default_data_format")]
    pub data_format: DataFormat,

    /// Wide sales table, only read when `data_format` is sqlite.
    #[serde(default = "default_sqlite_table")]
    pub sqlite_table: String,

    #[serde(default = "default_date_column")]
    pub date_column: String,

    #[serde(default = "default_medicines")]
    pub medicines: Vec<String>,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_path: default_data_path(),
            data_format: default_data_format(),
            sqlite_table: default_sqlite_table(),
            date_column: default_date_column(),
            medicines: default_medicines(),
            model_path: default_model_path(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Layers an optional config file under `MEDICINE_DEMAND__*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("medicines")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.medicines.is_empty() {
            return Err(invalid("medicine catalog is empty".to_string()));
        }
        if self.date_column.trim().is_empty() {
            return Err(invalid("date column is empty".to_string()));
        }
        Ok(())
    }

    pub fn source(&self) -> DataSource {
        match self.data_format {
            DataFormat::Csv => DataSource::Csv(self.data_path.clone()),
            DataFormat::Sqlite => DataSource::Sqlite {
                path: self.data_path.clone(),
                table: self.sqlite_table.clone(),
            },
        }
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout {
            date_column: self.date_column.clone(),
            medicines: self.medicines.clone(),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("medicine_demand={}", level));

    let builder = fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }

    info!(log_level = level, json, "tracing initialized");
}

fn invalid(message: String) -> DemandError {
    DemandError::Config(ConfigError::Message(message))
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/salesdaily.csv")
}

fn default_data_format() -> DataFormat {
    DataFormat::Csv
}

fn default_sqlite_table() -> String {
    "salesdaily".to_string()
}

fn default_date_column() -> String {
    DEFAULT_DATE_COLUMN.to_string()
}

fn default_medicines() -> Vec<String> {
    DEFAULT_CATALOG.iter().map(|m| m.to_string()).collect()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/medicine_demand_model.json")
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

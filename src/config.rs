//! Runtime settings: dataset layout, reader options, store options.
//!
//! Loaded from an optional TOML/YAML/JSON file, then overridden by
//! environment variables such as `ETL_STORE__ROOT=/data/warehouse` or
//! `ETL_INGEST__CHUNK_ROWS=100000`. Every field has a default, so an empty
//! configuration describes the standard dataset layout.

use crate::error::{ProcessingError, Result};
use crate::processors::SurrogateKeyMode;
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_CHUNK_ROWS, DEFAULT_ENCODING, DEFAULT_ROW_GROUP_SIZE,
    EVENT_DELIMITER, LEGACY_WEATHER_ENCODING, STOP_DELIMITER, TRANSPORT_EVENT_DIRS,
    TRANSPORT_STOPS_FILE, WEATHER_DELIMITER, WEATHER_MEASUREMENTS_DIR, WEATHER_STATIONS_FILE,
};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Relative source paths are resolved against this directory.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default)]
    pub sources: SourcePaths,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourcePaths {
    pub weather_stations: PathBuf,
    pub weather_measurements: PathBuf,
    pub transport_stops: PathBuf,
    /// Directories of monthly transport-event exports, processed in this order.
    #[validate(length(min = 1))]
    pub event_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub compression: String,
    #[validate(range(min = 1))]
    pub row_group_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows per batch; 0 reads each file in a single batch.
    pub chunk_rows: usize,
    #[validate(length(min = 1))]
    pub weather_encoding: String,
    #[validate(length(min = 1))]
    pub default_encoding: String,
    #[validate(length(equal = 1))]
    pub weather_delimiter: String,
    #[validate(length(equal = 1))]
    pub stop_delimiter: String,
    #[validate(length(equal = 1))]
    pub event_delimiter: String,
    pub surrogate_keys: SurrogateKeyMode,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("datasets")
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            weather_stations: PathBuf::from(WEATHER_STATIONS_FILE),
            weather_measurements: PathBuf::from(WEATHER_MEASUREMENTS_DIR),
            transport_stops: PathBuf::from(TRANSPORT_STOPS_FILE),
            event_dirs: TRANSPORT_EVENT_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("warehouse"),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            weather_encoding: LEGACY_WEATHER_ENCODING.to_string(),
            default_encoding: DEFAULT_ENCODING.to_string(),
            weather_delimiter: WEATHER_DELIMITER.to_string(),
            stop_delimiter: STOP_DELIMITER.to_string(),
            event_delimiter: EVENT_DELIMITER.to_string(),
            surrogate_keys: SurrogateKeyMode::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            sources: SourcePaths::default(),
            store: StoreConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Settings {
    /// Build settings from an optional file plus `ETL_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("ETL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.check()?;

        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    /// Validate field constraints that serde cannot express.
    pub fn check(&self) -> Result<()> {
        self.sources.validate()?;
        self.store.validate()?;
        self.ingest.validate()?;
        for delimiter in [
            &self.ingest.weather_delimiter,
            &self.ingest.stop_delimiter,
            &self.ingest.event_delimiter,
        ] {
            delimiter_byte(delimiter)?;
        }
        Ok(())
    }

    /// Resolve a source path against the data root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        }
    }

    pub fn weather_stations_path(&self) -> PathBuf {
        self.resolve(&self.sources.weather_stations)
    }

    pub fn weather_measurements_dir(&self) -> PathBuf {
        self.resolve(&self.sources.weather_measurements)
    }

    pub fn transport_stops_path(&self) -> PathBuf {
        self.resolve(&self.sources.transport_stops)
    }

    pub fn event_dirs(&self) -> Vec<PathBuf> {
        self.sources.event_dirs.iter().map(|d| self.resolve(d)).collect()
    }

    /// Batch bound for the chunked reader; `None` means whole-file batches.
    pub fn chunk_bound(&self) -> Option<usize> {
        (self.ingest.chunk_rows > 0).then_some(self.ingest.chunk_rows)
    }
}

/// The single byte of a one-character ASCII delimiter.
pub fn delimiter_byte(value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ProcessingError::Config(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_describe_standard_layout() {
        let settings = Settings::default();

        assert!(settings.check().is_ok());
        assert_eq!(
            settings.weather_stations_path(),
            PathBuf::from("datasets/weather/weatherStation.csv")
        );
        assert_eq!(settings.event_dirs().len(), 4);
        assert_eq!(settings.chunk_bound(), Some(DEFAULT_CHUNK_ROWS));
        assert_eq!(settings.ingest.surrogate_keys, SurrogateKeyMode::Continue);
    }

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
data_root = "/srv/open-data"

[store]
compression = "zstd"

[ingest]
chunk_rows = 0
surrogate_keys = "reset"
event_delimiter = ","
"#
        )?;

        let settings = Settings::load(Some(file.path()))?;

        assert_eq!(settings.data_root, PathBuf::from("/srv/open-data"));
        assert_eq!(settings.store.compression, "zstd");
        assert_eq!(settings.store.root, PathBuf::from("warehouse"));
        assert_eq!(settings.chunk_bound(), None);
        assert_eq!(settings.ingest.surrogate_keys, SurrogateKeyMode::Reset);
        assert_eq!(settings.ingest.event_delimiter, ",");
        assert_eq!(settings.ingest.weather_encoding, LEGACY_WEATHER_ENCODING);
        Ok(())
    }

    #[test]
    fn test_multi_character_delimiter_is_rejected() {
        let mut settings = Settings::default();
        settings.ingest.stop_delimiter = "||".to_string();

        assert!(settings.check().is_err());
        assert!(delimiter_byte(";").is_ok());
    }

    #[test]
    fn test_absolute_source_paths_bypass_data_root() {
        let mut settings = Settings::default();
        settings.sources.transport_stops = PathBuf::from("/tmp/stops.csv");

        assert_eq!(settings.transport_stops_path(), PathBuf::from("/tmp/stops.csv"));
    }
}

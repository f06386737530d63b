use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported text encoding: {0}")]
    UnknownEncoding(String),

    #[error("Invalid {encoding} byte sequence in {path}")]
    Encoding { encoding: String, path: String },

    #[error("Column '{column}' missing from {source_name} (entity {entity})")]
    MissingColumn {
        entity: String,
        column: String,
        source_name: String,
    },

    #[error("Column '{column}': cannot parse '{value}' as {expected}")]
    FieldParse {
        column: String,
        value: String,
        expected: String,
    },

    #[error("Relation '{relation}' has unexpected schema: {details}")]
    RelationSchema { relation: String, details: String },

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Stage dependency cycle involving {0}")]
    StageCycle(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    pub fn field_parse(column: &str, value: &str, expected: &str) -> Self {
        ProcessingError::FieldParse {
            column: column.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

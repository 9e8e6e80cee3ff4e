use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A column that must always be well-formed held a value that does not convert.
    #[error("Schema violation in column '{column}' at row {row}: {value:?}")]
    SchemaViolation {
        column: String,
        row: usize,
        value: String,
    },
}

impl EtlError {
    pub fn schema_violation(column: &str, row: usize, value: impl Into<String>) -> Self {
        EtlError::SchemaViolation {
            column: column.to_string(),
            row,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

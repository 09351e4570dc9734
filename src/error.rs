use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ClimateError {
    #[error("invalid source id: {0}")]
    InvalidSourceId(String),

    #[error("invalid dataset: {0}")]
    #[diagnostic(help("run `climate-feed datasets` to list the known datasets"))]
    InvalidDataset(String),

    #[error("source not present in catalog: {0}")]
    UnknownSource(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("failed to read backup file {path}: {message}")]
    Backup { path: String, message: String },

    #[error("failed to parse {source_id}: {message}")]
    Parse { source_id: String, message: String },

    #[error("{source_id} has no column named `{column}`")]
    MissingColumn { source_id: String, column: String },

    #[error("{source_id}: column `{column}` holds a non-numeric value `{value}`")]
    InvalidValue {
        source_id: String,
        column: String,
        value: String,
    },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("excel workbook error: {0}")]
    Excel(String),

    #[error("netcdf error: {0}")]
    NetCdf(String),

    #[error("format not supported for this operation: {0}")]
    UnsupportedFormat(String),

    #[error("cached dataset {0} was stored with a different type")]
    CacheType(String),

    #[error("failed to encode {0} as JSON")]
    Encode(String),

    #[error("shape mismatch: {0}")]
    Shape(String),
}

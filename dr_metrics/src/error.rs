use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// Requested metric name is not in the registry
    #[error("{key} is not valid. Accepted inputs are {accepted:?}")]
    InvalidMetricKey {
        key: String,
        accepted: Vec<&'static str>,
    },

    #[error("carrier '{carrier}' of component '{component}' is not in the carrier map")]
    UnknownCarrier { component: String, carrier: String },

    #[error("required table not found: {}", path.display())]
    MissingTable { path: PathBuf },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("year {year} is not in the model (available: {available:?})")]
    InvalidYear { year: i32, available: Vec<i32> },

    #[error("{metric} needs at least {needed} events but the analysis year has {available}")]
    InsufficientEvents {
        metric: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FundMetricsError {
    #[error("Storage error for fund {fund_id}: {details}")]
    Storage { fund_id: String, details: String },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FundMetricsError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrialError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Source: {0}")]
    Source(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

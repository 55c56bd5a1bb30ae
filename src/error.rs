//! Error type for the segmentation library

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RfmError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Input is missing the {field} column (looked for: {candidates})")]
    MissingColumn {
        field: &'static str,
        candidates: String,
    },

    #[error("No transactions left after cleaning")]
    EmptyDataset,

    #[error("{metric} has {distinct} distinct values; quantile scoring needs at least {required}")]
    InsufficientDistinctValues {
        metric: &'static str,
        distinct: usize,
        required: usize,
    },

    #[error("{metric} quantile edges are not strictly increasing: {edges:?}")]
    DegenerateQuantiles { metric: &'static str, edges: Vec<f64> },
}

pub type Result<T> = std::result::Result<T, RfmError>;

//! RFM Segmentation: customer scoring by Recency, Frequency and Monetary quantiles
//!
//! The library cleans invoice-level retail transactions, aggregates them per
//! customer, scores each metric into five equal-population buckets and
//! combines the scores into a three-digit segment code.

pub mod cli;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod rfm;
pub mod score;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{
    clean_transactions, enrich, load_transactions, transaction_frame, CancellationRule,
    CleaningSummary, RawTransaction,
};
pub use error::{Result, RfmError};
pub use pipeline::{run_pipeline, RfmConfig, RfmOutcome};
pub use rfm::{aggregate_customers, reference_date, CustomerMetrics};
pub use score::{score_customers, CustomerSegment, RfmScore};
pub use viz::generate_visualization_report;

//! End-to-end RFM pipeline: clean, enrich, aggregate, score

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;

use crate::data::{clean_transactions, enrich, CancellationRule, CleaningSummary};
use crate::error::{Result, RfmError};
use crate::rfm::{aggregate_customers, reference_date, DEFAULT_REFERENCE_OFFSET_DAYS};
use crate::score::{score_customers, CustomerSegment};

/// Settings for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfmConfig {
    pub cancellation_rule: CancellationRule,
    pub reference_offset_days: u64,
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self {
            cancellation_rule: CancellationRule::default(),
            reference_offset_days: DEFAULT_REFERENCE_OFFSET_DAYS,
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct RfmOutcome {
    pub cleaning: CleaningSummary,
    pub reference_date: NaiveDateTime,
    /// Cleaned transaction lines, with `line_total`, the scores were computed from
    pub line_items: DataFrame,
    /// Scored customers ordered by customer id
    pub segments: Vec<CustomerSegment>,
}

/// Run the full pipeline over loaded transactions
pub fn run_pipeline(transactions: DataFrame, config: &RfmConfig) -> Result<RfmOutcome> {
    let (records, cleaning) = clean_transactions(transactions, config.cancellation_rule)?;
    log::info!(
        "cleaner: kept {} of {} rows ({} missing fields, {} cancelled)",
        cleaning.retained,
        cleaning.total,
        cleaning.missing_fields,
        cleaning.cancelled
    );
    if cleaning.retained == 0 {
        log::warn!("cleaner: no rows survived cleaning");
    }

    let line_items = enrich(records)?;

    let reference_date = reference_date(&line_items, config.reference_offset_days)?
        .ok_or(RfmError::EmptyDataset)?;
    log::debug!("aggregator: reference date {reference_date}");

    let metrics = aggregate_customers(&line_items, reference_date)?;
    let segments = score_customers(metrics)?;

    Ok(RfmOutcome {
        cleaning,
        reference_date,
        line_items,
        segments,
    })
}

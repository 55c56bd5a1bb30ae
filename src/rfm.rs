//! Per-customer Recency, Frequency and Monetary aggregation

use chrono::{Days, NaiveDateTime};
use polars::prelude::*;

use crate::data::columns::{CUSTOMER_ID, INVOICE_ID, INVOICE_TIMESTAMP, LINE_TOTAL};
use crate::data::from_timestamp_millis;
use crate::error::Result;

/// Days added to the latest invoice date to form the reference date
pub const DEFAULT_REFERENCE_OFFSET_DAYS: u64 = 2;

/// Raw RFM values for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: i64,
    /// Whole days between the reference date and the last purchase
    pub recency: i64,
    /// Number of distinct invoices
    pub frequency: usize,
    /// Sum of line totals
    pub monetary: f64,
}

/// Reference date for recency: midnight of the latest invoice's calendar
/// date plus `offset_days`. `None` when the frame has no rows.
pub fn reference_date(items: &DataFrame, offset_days: u64) -> Result<Option<NaiveDateTime>> {
    let latest = items
        .column(INVOICE_TIMESTAMP)?
        .i64()?
        .max()
        .and_then(from_timestamp_millis);

    Ok(latest.and_then(|ts| {
        ts.date()
            .checked_add_days(Days::new(offset_days))?
            .and_hms_opt(0, 0, 0)
    }))
}

/// Group line items by customer and compute RFM values
///
/// # Arguments
/// * `items` - Cleaned frame carrying the `line_total` column
/// * `reference` - Batch-wide reference date from [`reference_date`]
///
/// # Returns
/// * Metrics for every customer with positive monetary value, ordered by
///   customer id
pub fn aggregate_customers(
    items: &DataFrame,
    reference: NaiveDateTime,
) -> Result<Vec<CustomerMetrics>> {
    let grouped = items
        .clone()
        .lazy()
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(INVOICE_TIMESTAMP).max().alias("last_purchase"),
            col(INVOICE_ID).n_unique().cast(DataType::Int64).alias("frequency"),
            col(LINE_TOTAL).sum().alias("monetary"),
        ])
        .collect()?;

    let rfm = grouped
        .clone()
        .lazy()
        .filter(col("monetary").gt(lit(0.0)))
        .sort([CUSTOMER_ID], SortMultipleOptions::default())
        .collect()?;

    let ids = rfm.column(CUSTOMER_ID)?.i64()?;
    let last_purchase = rfm.column("last_purchase")?.i64()?;
    let frequency = rfm.column("frequency")?.i64()?;
    let monetary = rfm.column("monetary")?.f64()?;

    let metrics: Vec<CustomerMetrics> = ids
        .into_no_null_iter()
        .zip(last_purchase.into_no_null_iter())
        .zip(frequency.into_no_null_iter())
        .zip(monetary.into_no_null_iter())
        .filter_map(|(((customer_id, last), frequency), monetary)| {
            let last = from_timestamp_millis(last)?;
            Some(CustomerMetrics {
                customer_id,
                recency: (reference - last).num_days(),
                frequency: frequency as usize,
                monetary,
            })
        })
        .collect();

    log::info!(
        "aggregator: {} customers, {} dropped for non-positive monetary value",
        metrics.len(),
        grouped.height() - metrics.len()
    );

    Ok(metrics)
}

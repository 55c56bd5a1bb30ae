//! Transaction loading, cleaning and line-total enrichment using Polars
//!
//! Every stage works on a frame with the canonical columns in [`columns`].
//! Timestamps are stored as milliseconds since the Unix epoch.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::error::{Result, RfmError};

/// Canonical column names
pub mod columns {
    pub const INVOICE_ID: &str = "invoice_id";
    pub const STOCK_CODE: &str = "stock_code";
    pub const DESCRIPTION: &str = "description";
    pub const QUANTITY: &str = "quantity";
    /// Milliseconds since the Unix epoch
    pub const INVOICE_TIMESTAMP: &str = "invoice_timestamp";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const COUNTRY: &str = "country";
    pub const LINE_TOTAL: &str = "line_total";

    /// The eight input fields in column order
    pub const TRANSACTION: [&str; 8] = [
        INVOICE_ID,
        STOCK_CODE,
        DESCRIPTION,
        QUANTITY,
        INVOICE_TIMESTAMP,
        UNIT_PRICE,
        CUSTOMER_ID,
        COUNTRY,
    ];
}

use columns::*;

/// Header names accepted for each input field, in lookup order
const INVOICE_HEADERS: &[&str] = &["InvoiceNo", "Invoice"];
const STOCK_CODE_HEADERS: &[&str] = &["StockCode"];
const DESCRIPTION_HEADERS: &[&str] = &["Description"];
const QUANTITY_HEADERS: &[&str] = &["Quantity"];
const TIMESTAMP_HEADERS: &[&str] = &["InvoiceDate"];
const UNIT_PRICE_HEADERS: &[&str] = &["UnitPrice", "Price"];
const CUSTOMER_HEADERS: &[&str] = &["CustomerID", "Customer ID"];
const COUNTRY_HEADERS: &[&str] = &["Country"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// One in-memory input row; any field may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub invoice_id: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub invoice_timestamp: Option<NaiveDateTime>,
    pub unit_price: Option<f64>,
    pub customer_id: Option<i64>,
    pub country: Option<String>,
}

/// How cancelled invoices are recognised from their identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancellationRule {
    /// The marker appears anywhere in the invoice id
    #[default]
    Contains,
    /// The invoice id starts with the marker
    Prefix,
}

impl CancellationRule {
    pub const MARKER: &'static str = "C";

    /// Expression that is true for cancelled invoices
    pub fn cancelled_expr(self) -> Expr {
        let invoice = col(INVOICE_ID).str();
        match self {
            CancellationRule::Contains => invoice.contains_literal(lit(Self::MARKER)),
            CancellationRule::Prefix => invoice.starts_with(lit(Self::MARKER)),
        }
    }
}

/// Row counts produced by [`clean_transactions`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningSummary {
    pub total: usize,
    pub missing_fields: usize,
    pub cancelled: usize,
    pub retained: usize,
}

/// Load transactions from a CSV file
///
/// # Arguments
/// * `file_path` - Path to the CSV file; headers are matched against the
///   classic (`InvoiceNo`, `UnitPrice`, `CustomerID`) and the "II"
///   (`Invoice`, `Price`, `Customer ID`) naming
///
/// # Returns
/// * A frame with the canonical transaction columns, one row per data row
pub fn load_transactions<P: AsRef<Path>>(file_path: P) -> Result<DataFrame> {
    // Every cell is read as text so a late "C..." invoice cannot break
    // type inference; numeric columns are cast afterwards
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.as_ref().to_path_buf()))?
        .finish()?;

    let df = normalize_frame(&raw)?;
    log::info!(
        "loader: read {} rows from {}",
        df.height(),
        file_path.as_ref().display()
    );
    Ok(df)
}

/// Rename and cast a loaded frame to the canonical transaction columns
pub fn normalize_frame(raw: &DataFrame) -> Result<DataFrame> {
    let timestamps = resolve_column(raw, INVOICE_TIMESTAMP, TIMESTAMP_HEADERS)?
        .cast(&DataType::String)?;
    let millis: Vec<Option<i64>> = timestamps
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_timestamp).map(timestamp_millis))
        .collect();

    let frame = DataFrame::new(vec![
        text_column(raw, INVOICE_ID, INVOICE_HEADERS)?,
        text_column(raw, STOCK_CODE, STOCK_CODE_HEADERS)?,
        text_column(raw, DESCRIPTION, DESCRIPTION_HEADERS)?,
        resolve_column(raw, QUANTITY, QUANTITY_HEADERS)?
            .cast(&DataType::Int64)?
            .with_name(QUANTITY),
        Series::new(INVOICE_TIMESTAMP, millis),
        resolve_column(raw, UNIT_PRICE, UNIT_PRICE_HEADERS)?
            .cast(&DataType::Float64)?
            .with_name(UNIT_PRICE),
        // IDs often arrive as floats (17850.0) when the column has nulls
        resolve_column(raw, CUSTOMER_ID, CUSTOMER_HEADERS)?
            .cast(&DataType::Float64)?
            .cast(&DataType::Int64)?
            .with_name(CUSTOMER_ID),
        text_column(raw, COUNTRY, COUNTRY_HEADERS)?,
    ])?;

    Ok(frame)
}

/// Build a canonical transaction frame from in-memory rows
pub fn transaction_frame(rows: &[RawTransaction]) -> Result<DataFrame> {
    fn text<'a>(
        rows: &'a [RawTransaction],
        get: fn(&RawTransaction) -> &Option<String>,
    ) -> Vec<Option<&'a str>> {
        rows.iter().map(|r| get(r).as_deref()).collect()
    }

    let timestamps: Vec<Option<i64>> = rows
        .iter()
        .map(|r| r.invoice_timestamp.map(timestamp_millis))
        .collect();

    let frame = DataFrame::new(vec![
        Series::new(INVOICE_ID, text(rows, |r| &r.invoice_id)),
        Series::new(STOCK_CODE, text(rows, |r| &r.stock_code)),
        Series::new(DESCRIPTION, text(rows, |r| &r.description)),
        Series::new(QUANTITY, rows.iter().map(|r| r.quantity).collect::<Vec<_>>()),
        Series::new(INVOICE_TIMESTAMP, timestamps),
        Series::new(UNIT_PRICE, rows.iter().map(|r| r.unit_price).collect::<Vec<_>>()),
        Series::new(CUSTOMER_ID, rows.iter().map(|r| r.customer_id).collect::<Vec<_>>()),
        Series::new(COUNTRY, text(rows, |r| &r.country)),
    ])?;
    Ok(frame)
}

/// Parse an invoice timestamp in any of the supported layouts
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    let raw = raw.trim_end_matches('Z');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn timestamp_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub fn from_timestamp_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Drop rows with missing fields and cancelled invoices
pub fn clean_transactions(
    df: DataFrame,
    rule: CancellationRule,
) -> Result<(DataFrame, CleaningSummary)> {
    let total = df.height();

    let complete = df.lazy().drop_nulls(None).collect()?;
    let missing_fields = total - complete.height();

    let cleaned = complete
        .clone()
        .lazy()
        .filter(rule.cancelled_expr().not())
        .collect()?;
    let cancelled = complete.height() - cleaned.height();

    let summary = CleaningSummary {
        total,
        missing_fields,
        cancelled,
        retained: cleaned.height(),
    };
    Ok((cleaned, summary))
}

/// Add `line_total = quantity * unit_price`
pub fn enrich(df: DataFrame) -> Result<DataFrame> {
    let line_total = col(QUANTITY).cast(DataType::Float64) * col(UNIT_PRICE);
    let enriched = df
        .lazy()
        .with_column(line_total.alias(LINE_TOTAL))
        .collect()?;
    Ok(enriched)
}

fn resolve_column<'a>(
    df: &'a DataFrame,
    field: &'static str,
    candidates: &[&str],
) -> Result<&'a Series> {
    candidates
        .iter()
        .find_map(|name| df.column(name).ok())
        .ok_or_else(|| RfmError::MissingColumn {
            field,
            candidates: candidates.join(", "),
        })
}

fn text_column(df: &DataFrame, field: &'static str, candidates: &[&str]) -> Result<Series> {
    let series = resolve_column(df, field, candidates)?
        .cast(&DataType::String)?
        .with_name(field);
    Ok(series)
}

//! Descriptive statistics over the raw, cleaned and scored tables

use std::collections::BTreeMap;

use ndarray::Array2;
use polars::prelude::*;

use crate::data::columns::{self, QUANTITY, STOCK_CODE};
use crate::error::Result;
use crate::score::{quantile, CustomerSegment};

/// Shape and completeness of the loaded input
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOverview {
    pub rows: usize,
    /// Missing-value count per field, in column order
    pub missing: Vec<(&'static str, usize)>,
    pub distinct_stock_codes: usize,
}

/// pandas-style `describe()` row for one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub name: &'static str,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

pub fn dataset_overview(df: &DataFrame) -> Result<DatasetOverview> {
    let missing = columns::TRANSACTION
        .iter()
        .map(|&name| -> Result<(&'static str, usize)> {
            Ok((name, df.column(name)?.null_count()))
        })
        .collect::<Result<Vec<_>>>()?;

    let distinct_stock_codes = df.column(STOCK_CODE)?.drop_nulls().n_unique()?;

    Ok(DatasetOverview {
        rows: df.height(),
        missing,
        distinct_stock_codes,
    })
}

/// Best-selling stock codes by total quantity, ties broken by stock code
pub fn top_products(items: &DataFrame, n: usize) -> Result<Vec<(String, i64)>> {
    let ranked = items
        .clone()
        .lazy()
        .group_by([col(STOCK_CODE)])
        .agg([col(QUANTITY).sum().alias("total_quantity")])
        .sort_by_exprs(
            [col("total_quantity"), col(STOCK_CODE)],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .limit(n as IdxSize)
        .collect()?;

    let codes = ranked.column(STOCK_CODE)?.str()?;
    let totals = ranked.column("total_quantity")?.i64()?;

    Ok(codes
        .into_no_null_iter()
        .zip(totals.into_no_null_iter())
        .map(|(code, quantity)| (code.to_string(), quantity))
        .collect())
}

/// Summaries for recency, frequency and monetary
pub fn describe_metrics(segments: &[CustomerSegment]) -> Vec<MetricSummary> {
    if segments.is_empty() {
        return Vec::new();
    }

    let table = Array2::from_shape_fn((segments.len(), 3), |(row, col)| {
        let metrics = &segments[row].metrics;
        match col {
            0 => metrics.recency as f64,
            1 => metrics.frequency as f64,
            _ => metrics.monetary,
        }
    });

    ["recency", "frequency", "monetary"]
        .iter()
        .enumerate()
        .map(|(col, &name)| {
            let column = table.column(col);
            let mut sorted = column.to_vec();
            sorted.sort_by(f64::total_cmp);

            MetricSummary {
                name,
                count: column.len(),
                mean: column.mean().unwrap_or(f64::NAN),
                std: column.std(1.0),
                min: sorted[0],
                q25: quantile(&sorted, 0.25),
                median: quantile(&sorted, 0.5),
                q75: quantile(&sorted, 0.75),
                max: sorted[sorted.len() - 1],
            }
        })
        .collect()
}

/// Customers per segment code, most populated first
pub fn segment_distribution(segments: &[CustomerSegment]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for segment in segments {
        *counts.entry(segment.segment_code()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub fn print_overview(overview: &DatasetOverview) {
    println!("\n=== Dataset Overview ===");
    println!("Rows: {}", overview.rows);
    println!("Distinct stock codes: {}", overview.distinct_stock_codes);
    println!("Missing values:");
    for (name, count) in &overview.missing {
        println!("  {:18} {}", name, count);
    }
}

pub fn print_top_products(products: &[(String, i64)]) {
    println!("\n=== Top Selling Products ===");
    for (rank, (code, quantity)) in products.iter().enumerate() {
        println!("  {:2}. {:10} {}", rank + 1, code, quantity);
    }
}

pub fn print_metric_summary(summaries: &[MetricSummary]) {
    println!("\n=== RFM Metrics ===");
    println!(
        "  {:9} | {:>6} | {:>10} | {:>10} | {:>8} | {:>8} | {:>8} | {:>8} | {:>10}",
        "metric", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summaries {
        println!(
            "  {:9} | {:6} | {:10.2} | {:10.2} | {:8.2} | {:8.2} | {:8.2} | {:8.2} | {:10.2}",
            s.name, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        );
    }
}

pub fn print_segment_distribution(distribution: &[(String, usize)], total: usize, top: usize) {
    println!("\n=== Segments ===");
    println!("Distinct segment codes: {}", distribution.len());
    for (code, count) in distribution.iter().take(top) {
        let percentage = (*count as f64 / total as f64) * 100.0;
        println!("  {}: {} customers ({:.1}%)", code, count, percentage);
    }
}

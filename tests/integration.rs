//! Integration tests for RFM Segmentation

use chrono::NaiveDate;
use polars::prelude::*;
use rfm_segmentation::data::columns::{INVOICE_ID, LINE_TOTAL, QUANTITY, UNIT_PRICE};
use rfm_segmentation::{
    load_transactions, report, run_pipeline, CancellationRule, RfmConfig, RfmError,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country"
    )
    .unwrap();

    // Customer 17850 - three invoices on the same day
    writeln!(file, "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2011-01-01 00:00:00,2.55,17850,United Kingdom").unwrap();
    writeln!(file, "536366,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2011-01-01 00:00:00,2.55,17850,United Kingdom").unwrap();
    writeln!(file, "536367,85123A,WHITE HANGING HEART T-LIGHT HOLDER,8,2011-01-01 00:00:00,2.55,17850,United Kingdom").unwrap();

    // Customer 13047 - single purchase
    writeln!(file, "536368,84406B,CREAM CUPID HEARTS COAT HANGER,8,2011-03-15 10:00:00,2.75,13047,United Kingdom").unwrap();

    // Customer 12345 - recent, two lines on one invoice
    writeln!(file, "536369,22752,SET 7 BABUSHKA NESTING BOXES,2,2011-12-05 10:15:00,7.65,12345,United Kingdom").unwrap();
    writeln!(file, "536369,21730,GLASS STAR FROSTED T-LIGHT HOLDER,12,2011-12-05 10:15:00,1.25,12345,United Kingdom").unwrap();

    // Customer 98765 - mid-year low value
    writeln!(file, "536370,22457,NATURAL SLATE HEART CHALKBOARD,4,2011-06-01 09:00:00,3.25,98765,United Kingdom").unwrap();

    // Customer 12680 - holds the latest invoice in the dataset
    writeln!(file, "581587,22613,PACK OF 20 SPACEBOY NAPKINS,12,2011-12-09 12:50:00,0.85,12680,France").unwrap();

    // Customer 14000 - two invoices, highest spend
    writeln!(file, "536371,22423,REGENCY CAKESTAND 3 TIER,10,2011-09-01 11:00:00,10.0,14000,United Kingdom").unwrap();
    writeln!(file, "536372,22423,REGENCY CAKESTAND 3 TIER,5,2011-10-01 11:00:00,10.0,14000,United Kingdom").unwrap();

    // Customer 14527 - only a cancellation, dated after every real sale
    writeln!(file, "C536379,D,Discount,-1,2011-12-20 09:41:00,27.5,14527,United Kingdom").unwrap();

    // Customer 15000 - free items only
    writeln!(file, "536380,22139,RETROSPOT TEA SET CERAMIC 11 PC,2,2011-05-01 10:00:00,0.0,15000,United Kingdom").unwrap();

    // Customer 16000 - "C" inside the invoice id
    writeln!(file, "5C36381,22086,PAPER CHAIN KIT 50'S CHRISTMAS,3,2011-08-01 10:00:00,4.0,16000,United Kingdom").unwrap();

    // Missing customer
    writeln!(file, "536382,22633,HAND WARMER UNION JACK,6,2011-12-01 08:28:00,1.85,,United Kingdom").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    assert_eq!(raw.height(), 14);

    let outcome = run_pipeline(raw, &RfmConfig::default()).unwrap();

    assert_eq!(outcome.cleaning.missing_fields, 1);
    assert_eq!(outcome.cleaning.cancelled, 2);
    assert_eq!(
        outcome.reference_date,
        NaiveDate::from_ymd_opt(2011, 12, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );

    let ids: Vec<i64> = outcome.segments.iter().map(|s| s.customer_id()).collect();
    assert_eq!(ids, vec![12345, 12680, 13047, 14000, 17850, 98765]);

    let customer = outcome
        .segments
        .iter()
        .find(|s| s.customer_id() == 17850)
        .unwrap();
    assert_eq!(customer.metrics.recency, 344);
    assert_eq!(customer.metrics.frequency, 3);
    assert!((customer.metrics.monetary - 51.0).abs() < 1e-9);
}

#[test]
fn test_output_invariants() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    let outcome = run_pipeline(raw, &RfmConfig::default()).unwrap();

    let items = &outcome.line_items;
    let quantities = items.column(QUANTITY).unwrap().i64().unwrap();
    let prices = items.column(UNIT_PRICE).unwrap().f64().unwrap();
    let totals = items.column(LINE_TOTAL).unwrap().f64().unwrap();
    for ((quantity, price), total) in quantities
        .into_no_null_iter()
        .zip(prices.into_no_null_iter())
        .zip(totals.into_no_null_iter())
    {
        assert_eq!(total, quantity as f64 * price);
    }

    for segment in &outcome.segments {
        assert!(segment.metrics.recency >= 0);
        assert!(segment.metrics.frequency >= 1);
        assert!(segment.metrics.monetary > 0.0);

        let code = segment.segment_code();
        assert_eq!(code.len(), 3);
        assert!(code.chars().all(|c| ('1'..='5').contains(&c)));
        assert_eq!(code.parse::<u16>().unwrap(), segment.segment_value());
    }
}

#[test]
fn test_scores_follow_metric_direction() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    let outcome = run_pipeline(raw, &RfmConfig::default()).unwrap();

    let find = |id: i64| {
        outcome
            .segments
            .iter()
            .find(|s| s.customer_id() == id)
            .unwrap()
    };

    // 12680 bought most recently, 17850 least recently
    assert_eq!(find(12680).score.recency, 5);
    assert_eq!(find(17850).score.recency, 1);
    // 14000 spent the most, 12680 the least
    assert_eq!(find(14000).score.monetary, 5);
    assert_eq!(find(12680).score.monetary, 1);
    // 17850 has the most invoices
    assert_eq!(find(17850).score.frequency, 5);
}

#[test]
fn test_cancelled_and_worthless_customers_are_excluded() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    let outcome = run_pipeline(raw, &RfmConfig::default()).unwrap();

    for id in [14527, 15000, 16000] {
        assert!(outcome.segments.iter().all(|s| s.customer_id() != id));
    }
    let invoices = outcome.line_items.column(INVOICE_ID).unwrap().str().unwrap();
    assert!(invoices.into_no_null_iter().all(|invoice| invoice != "C536379"));
}

#[test]
fn test_prefix_cancellation_rule() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    let config = RfmConfig {
        cancellation_rule: CancellationRule::Prefix,
        ..RfmConfig::default()
    };
    let outcome = run_pipeline(raw, &config).unwrap();

    assert_eq!(outcome.cleaning.cancelled, 1);
    assert!(outcome.segments.iter().any(|s| s.customer_id() == 16000));
    assert!(outcome.segments.iter().all(|s| s.customer_id() != 14527));
}

#[test]
fn test_pipeline_is_idempotent() {
    let test_file = create_test_csv();

    let config = RfmConfig::default();
    let first = run_pipeline(load_transactions(test_file.path()).unwrap(), &config).unwrap();
    let second = run_pipeline(load_transactions(test_file.path()).unwrap(), &config).unwrap();

    assert_eq!(first.reference_date, second.reference_date);
    assert_eq!(first.segments, second.segments);
}

#[test]
fn test_too_few_customers_is_a_data_quality_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country"
    )
    .unwrap();
    writeln!(file, "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850,United Kingdom").unwrap();
    writeln!(file, "536367,84406B,CREAM CUPID HEARTS COAT HANGER,8,2010-12-02 08:34:00,2.75,13047,United Kingdom").unwrap();

    let raw = load_transactions(file.path()).unwrap();
    let err = run_pipeline(raw, &RfmConfig::default()).unwrap_err();

    assert!(matches!(err, RfmError::InsufficientDistinctValues { .. }));
}

#[test]
fn test_report_on_pipeline_output() {
    let test_file = create_test_csv();
    let raw = load_transactions(test_file.path()).unwrap();
    let overview = report::dataset_overview(&raw).unwrap();
    let outcome = run_pipeline(raw, &RfmConfig::default()).unwrap();

    assert_eq!(overview.rows, 14);
    assert!(overview.missing.contains(&("customer_id", 1)));

    let top = report::top_products(&outcome.line_items, 1).unwrap();
    assert_eq!(top, vec![("85123A".to_string(), 20)]);

    // Every surviving product is listed when asked for more than five
    let all = report::top_products(&outcome.line_items, 20).unwrap();
    assert_eq!(all.len(), 8);
    assert_eq!(all[1], ("22423".to_string(), 15));

    let summaries = report::describe_metrics(&outcome.segments);
    assert!(summaries.iter().all(|s| s.count == 6));

    let distribution = report::segment_distribution(&outcome.segments);
    assert_eq!(
        distribution.iter().map(|(_, count)| count).sum::<usize>(),
        outcome.segments.len()
    );
}

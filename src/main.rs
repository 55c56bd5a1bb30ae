//! RFM Segmentation: customer scoring CLI
//!
//! This is the main entrypoint that orchestrates data loading, the RFM
//! pipeline, reporting and visualization.

use anyhow::Result;
use clap::Parser;
use rfm_segmentation::{load_transactions, report, run_pipeline, viz, Args};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    if args.verbose {
        println!("RFM Segmentation - Recency, Frequency, Monetary scoring");
        println!("=======================================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load data
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let transactions = load_transactions(&args.input)?;
    let overview = report::dataset_overview(&transactions)?;

    println!("✓ Data loaded: {} rows", transactions.height());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }
    report::print_overview(&overview);

    // Step 2: Clean, aggregate and score
    let config = args.to_config();
    if args.verbose {
        println!("\nStep 2: Scoring customers");
        println!("  Cancellation rule: {:?}", config.cancellation_rule);
        println!("  Reference offset: {} days", config.reference_offset_days);
    }

    let pipeline_start = Instant::now();
    let outcome = run_pipeline(transactions, &config)?;

    println!(
        "\n✓ Scored {} customers from {} transactions",
        outcome.segments.len(),
        outcome.cleaning.retained
    );
    println!("  Reference date: {}", outcome.reference_date.date());
    if args.verbose {
        println!(
            "  Dropped rows: {} missing fields, {} cancelled",
            outcome.cleaning.missing_fields, outcome.cleaning.cancelled
        );
        println!("  Scoring time: {:.2}s", pipeline_start.elapsed().as_secs_f64());
    }

    // Step 3: Report
    report::print_top_products(&report::top_products(&outcome.line_items, args.top)?);
    report::print_metric_summary(&report::describe_metrics(&outcome.segments));
    report::print_segment_distribution(
        &report::segment_distribution(&outcome.segments),
        outcome.segments.len(),
        args.top,
    );

    // Step 4: Visualize
    if !args.no_plots {
        if args.verbose {
            println!("\nStep 4: Generating visualizations");
            println!("  Output file: {}", args.output);
        }

        let viz_start = Instant::now();
        viz::generate_visualization_report(&outcome.segments, &args.output)?;

        println!("\n✓ Visualizations generated");
        if args.verbose {
            println!("  Visualization time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

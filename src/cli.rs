//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::data::CancellationRule;
use crate::pipeline::RfmConfig;
use crate::rfm::DEFAULT_REFERENCE_OFFSET_DAYS;

/// Customer segmentation CLI scoring Recency, Frequency and Monetary quantiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Output path for the segment scatter plot; histograms go next to it
    #[arg(short, long, default_value = "rfm_plot.png")]
    pub output: String,

    /// Treat only invoice ids starting with "C" as cancelled, instead of any
    /// id containing "C"
    #[arg(long)]
    pub prefix_cancellation: bool,

    /// Days added to the latest invoice date to form the recency reference
    #[arg(long, default_value_t = DEFAULT_REFERENCE_OFFSET_DAYS)]
    pub reference_offset_days: u64,

    /// Number of segments and products listed in the report
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Skip writing plot images
    #[arg(long)]
    pub no_plots: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Pipeline settings selected by the flags
    pub fn to_config(&self) -> RfmConfig {
        RfmConfig {
            cancellation_rule: if self.prefix_cancellation {
                CancellationRule::Prefix
            } else {
                CancellationRule::Contains
            },
            reference_offset_days: self.reference_offset_days,
        }
    }

    /// Default log filter for env_logger
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

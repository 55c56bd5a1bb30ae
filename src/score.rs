//! Quantile-based RFM scoring

use std::fmt;

use crate::error::{Result, RfmError};
use crate::rfm::CustomerMetrics;

/// Number of equal-population buckets per metric
pub const SCORE_BINS: usize = 5;

/// The three 1-5 scores of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RfmScore {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScore {
    /// Three-digit segment code, e.g. "534"
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// The segment code read as an integer, e.g. 534
    pub fn value(&self) -> u16 {
        u16::from(self.recency) * 100 + u16::from(self.frequency) * 10 + u16::from(self.monetary)
    }
}

impl fmt::Display for RfmScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.recency, self.frequency, self.monetary)
    }
}

/// A scored customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSegment {
    pub metrics: CustomerMetrics,
    pub score: RfmScore,
}

impl CustomerSegment {
    pub fn customer_id(&self) -> i64 {
        self.metrics.customer_id
    }

    pub fn segment_code(&self) -> String {
        self.score.code()
    }

    pub fn segment_value(&self) -> u16 {
        self.score.value()
    }
}

/// Empirical quantile of sorted data with linear interpolation between
/// neighbouring order statistics
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// 1-based ranks where ties keep their input order
pub fn first_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = (position + 1) as f64;
    }
    ranks
}

/// Equal-population bucket edges fitted on one metric
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    metric: &'static str,
    edges: Vec<f64>,
}

impl QuantileBins {
    /// Fit `bins` buckets on `values`.
    ///
    /// Fails when there are fewer distinct values than buckets or when ties
    /// collapse two edges onto the same value.
    pub fn fit(metric: &'static str, values: &[f64], bins: usize) -> Result<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();
        if distinct.len() < bins {
            return Err(RfmError::InsufficientDistinctValues {
                metric,
                distinct: distinct.len(),
                required: bins,
            });
        }

        let edges: Vec<f64> = (0..=bins)
            .map(|k| quantile(&sorted, k as f64 / bins as f64))
            .collect();
        if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(RfmError::DegenerateQuantiles { metric, edges });
        }

        log::debug!("scorer: {metric} edges {edges:?}");
        Ok(Self { metric, edges })
    }

    pub fn metric(&self) -> &'static str {
        self.metric
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// 1-based bucket of `value`; buckets are right-closed and the first one
    /// also holds its lower edge
    pub fn bucket(&self, value: f64) -> usize {
        let inner = &self.edges[1..self.edges.len() - 1];
        1 + inner.iter().filter(|&&edge| value > edge).count()
    }
}

/// Score every customer against the current population
///
/// # Arguments
/// * `metrics` - Aggregated customers; their order is the tie-break order for
///   frequency ranking
///
/// # Returns
/// * One `CustomerSegment` per input customer, in input order
pub fn score_customers(metrics: Vec<CustomerMetrics>) -> Result<Vec<CustomerSegment>> {
    let recency: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
    let frequencies: Vec<f64> = metrics.iter().map(|m| m.frequency as f64).collect();
    let frequency_rank = first_rank(&frequencies);
    let monetary: Vec<f64> = metrics.iter().map(|m| m.monetary).collect();

    let recency_bins = QuantileBins::fit("recency", &recency, SCORE_BINS)?;
    let frequency_bins = QuantileBins::fit("frequency", &frequency_rank, SCORE_BINS)?;
    let monetary_bins = QuantileBins::fit("monetary", &monetary, SCORE_BINS)?;

    let segments: Vec<CustomerSegment> = metrics
        .into_iter()
        .enumerate()
        .map(|(i, metrics)| {
            // Most recent customers land in the first bucket and score highest
            let score = RfmScore {
                recency: (SCORE_BINS + 1 - recency_bins.bucket(recency[i])) as u8,
                frequency: frequency_bins.bucket(frequency_rank[i]) as u8,
                monetary: monetary_bins.bucket(monetary[i]) as u8,
            };
            CustomerSegment { metrics, score }
        })
        .collect();

    log::info!("scorer: scored {} customers", segments.len());
    Ok(segments)
}

//! Visualization of RFM metrics and segments using Plotters

use plotters::prelude::*;

use crate::score::{CustomerSegment, SCORE_BINS};

/// Number of bins in each metric histogram
pub const HISTOGRAM_BINS: usize = 50;

const METRIC_COLORS: [RGBColor; 3] = [BLUE, GREEN, MAGENTA];

/// Lowest and highest segment values ("111" and "555")
const SEGMENT_VALUE_RANGE: (f64, f64) = (111.0, 555.0);

/// Equal-width histogram of `values`
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width intervals spanning min..max;
    /// the last interval is closed so the maximum is counted
    pub fn new(values: &[f64], bins: usize) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if values.is_empty() || bins == 0 {
            return Self {
                start: 0.0,
                width: 1.0,
                counts: vec![0; bins],
            };
        }

        let span = if max > min { max - min } else { 1.0 };
        let width = span / bins as f64;
        let mut counts = vec![0; bins];
        for &v in values {
            let index = (((v - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Self {
            start: min,
            width,
            counts,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.width * self.counts.len() as f64
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Color for a segment value, running from red at "111" towards violet at "555"
pub fn segment_color(segment_value: u16) -> HSLColor {
    let (low, high) = SEGMENT_VALUE_RANGE;
    let t = ((f64::from(segment_value) - low) / (high - low)).clamp(0.0, 1.0);
    HSLColor(0.8 * t, 0.75, 0.45)
}

/// Marker radius for a segment value; higher segments draw larger
pub fn segment_marker_size(segment_value: u16) -> i32 {
    let (low, high) = SEGMENT_VALUE_RANGE;
    let t = ((f64::from(segment_value) - low) / (high - low)).clamp(0.0, 1.0);
    2 + (t * 6.0).round() as i32
}

/// Draw stacked histograms of recency, frequency and monetary
pub fn create_metric_histograms(
    segments: &[CustomerSegment],
    output_path: &str,
) -> anyhow::Result<()> {
    let series: [(&str, Vec<f64>); 3] = [
        ("Recency (days)", segments.iter().map(|s| s.metrics.recency as f64).collect()),
        ("Frequency (invoices)", segments.iter().map(|s| s.metrics.frequency as f64).collect()),
        ("Monetary", segments.iter().map(|s| s.metrics.monetary).collect()),
    ];

    let root = BitMapBackend::new(output_path, (1200, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((3, 1));

    for ((area, (label, values)), color) in areas
        .iter()
        .zip(series.iter())
        .zip(METRIC_COLORS.iter())
    {
        let histogram = Histogram::new(values, HISTOGRAM_BINS);

        let mut chart = ChartBuilder::on(area)
            .caption(*label, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(
                histogram.start..histogram.end(),
                0f64..(histogram.max_count().max(1) as f64 * 1.1),
            )?;

        chart
            .configure_mesh()
            .y_desc("Customers")
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        chart.draw_series(histogram.counts.iter().enumerate().map(|(i, &count)| {
            let x0 = histogram.start + i as f64 * histogram.width;
            Rectangle::new(
                [(x0, 0.0), (x0 + histogram.width, count as f64)],
                color.mix(0.7).filled(),
            )
        }))?;
    }

    root.present()?;
    println!("Metric histograms saved to: {}", output_path);

    Ok(())
}

/// Draw a 3D scatter of the three scores, colored and sized by segment
pub fn create_segment_scatter(
    segments: &[CustomerSegment],
    output_path: &str,
) -> anyhow::Result<()> {
    let axis = 0.5f64..(SCORE_BINS as f64 + 0.5);

    let root = BitMapBackend::new(output_path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "RFM Visualisation (x: recency, y: frequency, z: monetary score)",
            ("sans-serif", 24),
        )
        .margin(20)
        .build_cartesian_3d(axis.clone(), axis.clone(), axis)?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.8;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(1)
        .draw()?;

    chart.draw_series(segments.iter().map(|s| {
        let value = s.segment_value();
        Circle::new(
            (
                f64::from(s.score.recency),
                f64::from(s.score.frequency),
                f64::from(s.score.monetary),
            ),
            segment_marker_size(value),
            segment_color(value).mix(0.5).filled(),
        )
    }))?;

    root.present()?;
    println!("Segment scatter saved to: {}", output_path);

    Ok(())
}

/// Write the segment scatter to `base_output_path` and the histograms next
/// to it with a `_metrics` suffix
pub fn generate_visualization_report(
    segments: &[CustomerSegment],
    base_output_path: &str,
) -> anyhow::Result<()> {
    create_segment_scatter(segments, base_output_path)?;

    let histogram_path = histogram_path(base_output_path);
    create_metric_histograms(segments, &histogram_path)?;

    Ok(())
}

/// Path of the histogram image derived from the scatter plot path
pub fn histogram_path(base_output_path: &str) -> String {
    match base_output_path.strip_suffix(".png") {
        Some(stem) => format!("{stem}_metrics.png"),
        None => format!("{base_output_path}_metrics.png"),
    }
}

//! Latency statistics over one batch of probe timings.

/// Aggregate of the valid (positive) timings of a batch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub max: i64,
    pub mean: f64,
    pub min: i64,
    pub stddev: f64,
    pub sum: i64,
    pub count: usize,
}

/// Compute max, mean, min, population standard deviation and sum.
///
/// Non-positive values mark failed attempts and are excluded from every
/// statistic. With no valid value the summary is all zeros.
pub fn aggregate(timings: &[i64]) -> Summary {
    let mut summary = Summary::default();

    for &ts in timings.iter().filter(|&&ts| ts > 0) {
        if summary.count == 0 {
            summary.max = ts;
            summary.min = ts;
        }
        if ts >= summary.max {
            summary.max = ts;
        }
        if ts <= summary.min {
            summary.min = ts;
        }
        summary.sum = summary.sum.saturating_add(ts);
        summary.count += 1;
    }

    if summary.count == 0 {
        return summary;
    }

    let count = summary.count as f64;
    let valid = || timings.iter().filter(|&&ts| ts > 0);
    // mean from floats, the integer sum saturates
    summary.mean = valid().map(|&ts| ts as f64).sum::<f64>() / count;
    let variance = valid()
        .map(|&ts| (ts as f64 - summary.mean).powi(2))
        .sum::<f64>()
        / count;
    summary.stddev = variance.sqrt();

    summary
}

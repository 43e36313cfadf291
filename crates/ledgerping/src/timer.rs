use tokio::time::Instant;

use crate::stats::{Summary, aggregate};

/// Wall-clock timer for a single probe attempt
///
/// Backed by [`tokio::time::Instant`] so paused-clock tests measure exactly
/// the time the runtime advanced.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
    end: Option<Instant>,
}

impl Stopwatch {
    /// Start timing now
    pub fn start() -> Self {
        Self { start: Instant::now(), end: None }
    }

    /// Freeze the elapsed time; later calls keep the first stop
    pub fn stop(&mut self) -> i64 {
        let end = *self.end.get_or_insert_with(Instant::now);
        Self::millis(end - self.start)
    }

    /// Elapsed milliseconds, up to the stop point if stopped
    pub fn elapsed_ms(&self) -> i64 {
        let end = self.end.unwrap_or_else(Instant::now);
        Self::millis(end - self.start)
    }

    fn millis(duration: std::time::Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Successful attempt timings collected over one batch
#[derive(Debug, Clone, Default)]
pub struct TakeTime {
    times: Vec<i64>,
}

impl TakeTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, elapsed_ms: i64) {
        self.times.push(elapsed_ms);
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn statistic(&self) -> Summary {
        aggregate(&self.times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_stopwatch_measures_paused_time() {
        let mut watch = Stopwatch::start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(watch.stop(), 120);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(watch.elapsed_ms(), 120);
        assert_eq!(watch.stop(), 120);
    }

    #[test]
    fn test_take_time_statistic() {
        let mut take = TakeTime::new();
        take.add(10);
        take.add(30);

        let summary = take.statistic();
        assert_eq!(take.times(), &[10, 30]);
        assert_eq!(summary.sum, 40);
        assert_eq!(summary.mean, 20.0);
    }
}

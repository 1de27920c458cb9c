//! Running-average per-stage timing, logged instead of printed.
//!
//! Direct port of `original_source/opencv/Profiler.{hpp,cpp}` and
//! `FrameSourceProfile.{hpp,cpp}`: each call to [`Profiler::record`] folds
//! one more sample into a running mean, and [`Profiler::report`] (called
//! by the CLI on shutdown) logs ms/frame, percent of total wall time, and
//! effective fps through `log::debug!` in place of the original's
//! `fprintf(stderr, ...)`.

use std::time::{Duration, Instant};

pub struct Profiler {
    label: &'static str,
    sample_count: u64,
    total: Duration,
}

impl Profiler {
    pub fn new(label: &'static str) -> Self {
        Profiler { label, sample_count: 0, total: Duration::ZERO }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.sample_count += 1;
        self.total += elapsed;
    }

    pub fn mean_millis(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / self.sample_count as f64
        }
    }

    pub fn effective_fps(&self) -> f64 {
        let mean = self.mean_millis();
        if mean <= 0.0 {
            0.0
        } else {
            1000.0 / mean
        }
    }

    pub fn percent_of(&self, wall_time: Duration) -> f64 {
        if wall_time.as_secs_f64() <= 0.0 {
            0.0
        } else {
            100.0 * self.total.as_secs_f64() / wall_time.as_secs_f64()
        }
    }

    pub fn report(&self, wall_time: Duration) {
        log::debug!(
            "{}: {:.3} ms/frame, {:.1} fps, {:.1}% of wall time over {} frames",
            self.label,
            self.mean_millis(),
            self.effective_fps(),
            self.percent_of(wall_time),
            self.sample_count,
        );
    }
}

/// Times one pull through `source` and folds the elapsed duration into
/// `profiler`. Used by `pipeline::ProfilingSource` rather than inlining
/// `Instant::now()` bookkeeping at every call site.
pub fn timed<T>(profiler: &mut Profiler, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    profiler.record(start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_zero_with_no_samples() {
        let p = Profiler::new("test");
        assert_eq!(p.mean_millis(), 0.0);
        assert_eq!(p.effective_fps(), 0.0);
    }

    #[test]
    fn mean_millis_averages_recorded_samples() {
        let mut p = Profiler::new("test");
        p.record(Duration::from_millis(10));
        p.record(Duration::from_millis(20));
        assert!((p.mean_millis() - 15.0).abs() < 1e-9);
    }
}

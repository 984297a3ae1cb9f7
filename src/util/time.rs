//! High-precision timing utilities.
//!
//! Kept from the teacher almost verbatim: `Timestamp` wraps `Instant` for
//! convenience, `format_duration`/`format_rate` render human-readable
//! numbers. The teacher's `calculate_iops`/`calculate_throughput`/
//! `format_throughput` are dropped — this system has no IOPS or byte
//! throughput concept — and replaced with `chapters_per_hour`, the
//! equivalent "inferred throughput" figure the run summary reports.

use std::time::{Duration, Instant};

/// High-precision timestamp for elapsed-time measurements.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    instant: Instant,
}

impl Timestamp {
    #[inline]
    pub fn now() -> Self {
        Self { instant: Instant::now() }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    #[inline]
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.instant.duration_since(earlier.instant)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

/// Format a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use novel_condenser::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Format a rate (e.g. chapters/hour) with K/M/G suffixes.
///
/// # Examples
///
/// ```
/// use novel_condenser::util::time::format_rate;
///
/// assert_eq!(format_rate(500.0), "500");
/// assert_eq!(format_rate(1500.0), "1.50K");
/// assert_eq!(format_rate(2_500_000.0), "2.50M");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate < 1_000.0 {
        format!("{:.0}", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else if rate < 1_000_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else {
        format!("{:.2}G", rate / 1_000_000_000.0)
    }
}

/// Inferred throughput for the final report: successful chapters per hour
/// of wall-clock runtime. Zero runtime reports zero rather than dividing by
/// zero.
pub fn chapters_per_hour(successful_chapters: usize, runtime: Duration) -> f64 {
    let seconds = runtime.as_secs_f64();
    if seconds > 0.0 {
        successful_chapters as f64 / (seconds / 3600.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn timestamp_elapsed_reflects_real_time() {
        let start = Timestamp::now();
        thread::sleep(Duration::from_millis(5));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn format_duration_picks_the_right_unit() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn format_rate_picks_the_right_suffix() {
        assert_eq!(format_rate(500.0), "500");
        assert_eq!(format_rate(1500.0), "1.50K");
        assert_eq!(format_rate(1_500_000.0), "1.50M");
    }

    #[test]
    fn chapters_per_hour_scales_to_an_hour() {
        let rate = chapters_per_hour(30, Duration::from_secs(1800));
        assert!((rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn chapters_per_hour_is_zero_for_zero_runtime() {
        assert_eq!(chapters_per_hour(10, Duration::ZERO), 0.0);
    }
}

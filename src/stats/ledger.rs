//! Process-wide statistics accumulator.
//!
//! Unlike the per-worker histograms this crate's teacher aggregates across
//! threads, a batch of chapters needs only simple running totals behind one
//! lock — there is no merge step because every worker reports straight into
//! the same ledger.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::job::{ChapterOutcome, SkipReason};

#[derive(Debug, Clone)]
pub struct FileStat {
    pub path: PathBuf,
    pub outcome_label: &'static str,
    pub elapsed: Duration,
    pub ratio: Option<f64>,
}

#[derive(Default)]
struct Totals {
    total_files: usize,
    success_count: usize,
    failed_count: usize,
    retry_count: u64,
    condensation_ratios: Vec<f64>,
    total_characters_original: u64,
    total_characters_condensed: u64,
    file_stats: Vec<FileStat>,
    failed_paths: Vec<PathBuf>,
}

pub struct StatisticsLedger {
    start_time: Instant,
    end_time: Mutex<Option<Instant>>,
    totals: Mutex<Totals>,
}

impl StatisticsLedger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: Mutex::new(None),
            totals: Mutex::new(Totals::default()),
        }
    }

    pub fn record(&self, path: PathBuf, outcome: &ChapterOutcome, retries: u32) {
        let mut totals = self.totals.lock().unwrap();
        totals.total_files += 1;
        totals.retry_count += retries as u64;

        let (label, elapsed) = match outcome {
            ChapterOutcome::Condensed { original_chars, condensed_chars, elapsed, .. } => {
                totals.success_count += 1;
                totals.total_characters_original += *original_chars as u64;
                totals.total_characters_condensed += *condensed_chars as u64;
                if let Some(ratio) = outcome.ratio() {
                    totals.condensation_ratios.push(ratio);
                }
                ("success", *elapsed)
            }
            ChapterOutcome::Skipped { reason } => {
                totals.success_count += 1;
                (skip_label(*reason), Duration::ZERO)
            }
            ChapterOutcome::Failed { .. } => {
                totals.failed_count += 1;
                totals.failed_paths.push(path.clone());
                ("failed", Duration::ZERO)
            }
        };

        totals.file_stats.push(FileStat {
            path,
            outcome_label: label,
            elapsed,
            ratio: outcome.ratio(),
        });
    }

    pub fn mark_finished(&self) {
        *self.end_time.lock().unwrap() = Some(Instant::now());
    }

    pub fn summary(&self) -> Summary {
        let totals = self.totals.lock().unwrap();
        let end = self.end_time.lock().unwrap().unwrap_or_else(Instant::now);
        let total_runtime = end.duration_since(self.start_time);

        let ratios = &totals.condensation_ratios;
        let (min_ratio, mean_ratio, max_ratio) = if ratios.is_empty() {
            (None, None, None)
        } else {
            let min = ratios.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = ratios.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
            (Some(min), Some(mean), Some(max))
        };

        let overall_ratio = if totals.total_characters_original > 0 {
            Some(totals.total_characters_condensed as f64 / totals.total_characters_original as f64)
        } else {
            None
        };

        let avg_chapter_wall_time = if totals.success_count > 0 {
            let sum: Duration = totals.file_stats.iter().map(|f| f.elapsed).sum();
            Some(sum / totals.success_count.max(1) as u32)
        } else {
            None
        };

        let chapters_per_hour = crate::util::time::chapters_per_hour(totals.success_count, total_runtime);

        Summary {
            total_runtime,
            total_files: totals.total_files,
            success_count: totals.success_count,
            failed_count: totals.failed_count,
            retry_count: totals.retry_count,
            min_ratio,
            mean_ratio,
            max_ratio,
            overall_ratio,
            total_characters_original: totals.total_characters_original,
            total_characters_condensed: totals.total_characters_condensed,
            avg_chapter_wall_time,
            chapters_per_hour,
            failed_paths: totals.failed_paths.clone(),
        }
    }
}

impl Default for StatisticsLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::AlreadyDone => "skipped",
        SkipReason::Empty => "empty",
        SkipReason::CacheHit => "success-cached",
        SkipReason::Directory => "success-directory",
        SkipReason::ShortInput => "success-short",
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub total_runtime: Duration,
    pub total_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub retry_count: u64,
    pub min_ratio: Option<f64>,
    pub mean_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
    pub overall_ratio: Option<f64>,
    pub total_characters_original: u64,
    pub total_characters_condensed: u64,
    pub avg_chapter_wall_time: Option<Duration>,
    pub chapters_per_hour: f64,
    pub failed_paths: Vec<PathBuf>,
}

impl Summary {
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_files as f64
        }
    }
}

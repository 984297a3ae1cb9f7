//! JSON report output: an optional `summary.json` alongside the condensed
//! chapters, the way the teacher's `output::json` serializes `WorkerStats`.

use std::path::Path;

use serde::Serialize;

use crate::stats::Summary;
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub total_runtime_seconds: f64,
    pub total_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub success_rate: f64,
    pub retry_count: u64,
    pub min_ratio_percent: Option<f64>,
    pub mean_ratio_percent: Option<f64>,
    pub max_ratio_percent: Option<f64>,
    pub overall_ratio_percent: Option<f64>,
    pub total_characters_original: u64,
    pub total_characters_condensed: u64,
    pub avg_chapter_wall_time_seconds: Option<f64>,
    pub chapters_per_hour: f64,
    pub failed_paths: Vec<String>,
}

impl From<&Summary> for JsonSummary {
    fn from(summary: &Summary) -> Self {
        Self {
            total_runtime_seconds: summary.total_runtime.as_secs_f64(),
            total_files: summary.total_files,
            success_count: summary.success_count,
            failed_count: summary.failed_count,
            success_rate: summary.success_rate(),
            retry_count: summary.retry_count,
            min_ratio_percent: summary.min_ratio.map(|r| r * 100.0),
            mean_ratio_percent: summary.mean_ratio.map(|r| r * 100.0),
            max_ratio_percent: summary.max_ratio.map(|r| r * 100.0),
            overall_ratio_percent: summary.overall_ratio.map(|r| r * 100.0),
            total_characters_original: summary.total_characters_original,
            total_characters_condensed: summary.total_characters_condensed,
            avg_chapter_wall_time_seconds: summary.avg_chapter_wall_time.map(|d| d.as_secs_f64()),
            chapters_per_hour: summary.chapters_per_hour,
            failed_paths: summary.failed_paths.iter().map(|p| p.display().to_string()).collect(),
        }
    }
}

/// Writes the summary as pretty-printed JSON to `path` (typically
/// `<output_dir>/summary.json`).
pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let json_summary = JsonSummary::from(summary);
    let json = serde_json::to_string_pretty(&json_summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_summary() -> Summary {
        let ledger = crate::stats::StatisticsLedger::new();
        ledger.record(
            std::path::PathBuf::from("a.txt"),
            &crate::job::ChapterOutcome::Condensed {
                family: crate::job::ApiFamily::Gemini,
                original_chars: 1000,
                condensed_chars: 400,
                chunks: 1,
                retries: 0,
                elapsed: Duration::from_secs(2),
            },
            0,
        );
        ledger.mark_finished();
        ledger.summary()
    }

    #[test]
    fn json_summary_carries_ratio_as_percent() {
        let summary = sample_summary();
        let json_summary = JsonSummary::from(&summary);
        assert_eq!(json_summary.min_ratio_percent, Some(40.0));
        assert_eq!(json_summary.total_characters_original, 1000);
    }

    #[test]
    fn write_summary_produces_parseable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&path, &sample_summary()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["total_files"], 1);
    }
}

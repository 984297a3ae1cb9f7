//! Human-readable text output.

use crate::stats::Summary;
use crate::util::time::{format_duration, format_rate};

/// Print the final batch summary to stdout.
pub fn print_summary(summary: &Summary) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    BATCH SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Elapsed Time: {}", format_duration(summary.total_runtime));
    println!();

    println!("Chapters:");
    println!("  Total:      {}", format_number(summary.total_files as u64));
    println!(
        "  Successful: {} ({:.2}%)",
        format_number(summary.success_count as u64),
        summary.success_rate() * 100.0
    );
    println!("  Failed:     {}", format_number(summary.failed_count as u64));
    println!("  Retries:    {}", format_number(summary.retry_count));
    println!();

    if let (Some(min), Some(mean), Some(max)) = (summary.min_ratio, summary.mean_ratio, summary.max_ratio) {
        println!("Condensation Ratio:");
        println!("  Min:  {:.1}%", min * 100.0);
        println!("  Mean: {:.1}%", mean * 100.0);
        println!("  Max:  {:.1}%", max * 100.0);
        println!();
    }

    println!("Characters:");
    println!("  Original:  {}", format_number(summary.total_characters_original));
    println!("  Condensed: {}", format_number(summary.total_characters_condensed));
    if let Some(overall) = summary.overall_ratio {
        println!("  Overall ratio: {:.1}%", overall * 100.0);
    }
    println!();

    if let Some(avg) = summary.avg_chapter_wall_time {
        println!("Average chapter wall time: {}", format_duration(avg));
    }
    println!("Throughput: {} chapters/hour", format_rate(summary.chapters_per_hour));

    if !summary.failed_paths.is_empty() {
        println!();
        println!("Failed files:");
        for path in &summary.failed_paths {
            println!("  {}", path.display());
        }
    }

    println!();
    println!("═══════════════════════════════════════════════════════════");
}

/// Banner printed before processing starts, the way the teacher's
/// `print_configuration` summarizes the run before it kicks off workers.
pub fn print_configuration(
    input: &std::path::Path,
    output: &std::path::Path,
    api_mode: &str,
    worker_count: usize,
    chapter_count: usize,
    force_regenerate: bool,
) {
    println!("Configuration:");
    println!("  Input:      {}", input.display());
    println!("  Output:     {}", output.display());
    println!("  API:        {api_mode}");
    println!("  Workers:    {worker_count}");
    println!("  Chapters:   {chapter_count}");
    if force_regenerate {
        println!("  Force:      regenerating even when a valid output/cache entry exists");
    }
    println!();
}

/// Format a number with thousands separators.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let mut count = 0;

    for c in s.chars().rev() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
        count += 1;
    }

    result.chars().rev().collect()
}

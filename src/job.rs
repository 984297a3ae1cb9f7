//! Chapter job and outcome types
//!
//! A `ChapterJob` is one unit of batch work: a single input file that the
//! driver hands to a worker thread. A `ChapterOutcome` is what comes back.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use std::sync::OnceLock;

/// Which upstream API family a chapter should be dispatched to.
///
/// In mixed mode the driver decides this per-job (see `driver::assign_family`);
/// in single-provider mode every job carries the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    Gemini,
    OpenAi,
}

impl ApiFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFamily::Gemini => "gemini",
            ApiFamily::OpenAi => "openai",
        }
    }
}

/// One chapter file queued for condensation.
#[derive(Debug, Clone)]
pub struct ChapterJob {
    /// Index within the batch, in input order. Used for mixed-mode family
    /// assignment and for ordering the final report.
    pub index: usize,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Chapter number parsed from the filename, if any (e.g. "Chapter 12.txt" -> 12).
    pub chapter_number: Option<u32>,
}

/// Why a chapter was not condensed, when it wasn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDone,
    Empty,
    CacheHit,
    Directory,
    ShortInput,
}

/// The result of processing a single chapter job.
#[derive(Debug, Clone)]
pub enum ChapterOutcome {
    Condensed {
        family: ApiFamily,
        original_chars: usize,
        condensed_chars: usize,
        chunks: usize,
        /// Adapter retries actually spent, summed across chunks (each
        /// chunk's own first attempt does not count as a retry).
        retries: u32,
        elapsed: Duration,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
        retries: u32,
    },
}

impl ChapterOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ChapterOutcome::Condensed { .. } | ChapterOutcome::Skipped { .. })
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            ChapterOutcome::Condensed { original_chars, condensed_chars, .. } if *original_chars > 0 => {
                Some(*condensed_chars as f64 / *original_chars as f64)
            }
            _ => None,
        }
    }
}

/// Final per-file record produced by the driver, independent of outcome kind.
#[derive(Debug, Clone)]
pub struct ChapterResult {
    pub job: ChapterJob,
    pub outcome: ChapterOutcome,
}

fn chapter_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

/// Pull the first run of digits out of a filename stem, used to order
/// chapters and to alternate families in mixed mode.
///
/// Returns `None` when the stem has no digits at all (e.g. "preface.txt").
pub fn parse_chapter_number(file_stem: &str) -> Option<u32> {
    chapter_number_re()
        .find(file_stem)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_and_embedded_numbers() {
        assert_eq!(parse_chapter_number("Chapter 12"), Some(12));
        assert_eq!(parse_chapter_number("012"), Some(12));
        assert_eq!(parse_chapter_number("ch_007_final"), Some(7));
    }

    #[test]
    fn returns_none_without_digits() {
        assert_eq!(parse_chapter_number("preface"), None);
        assert_eq!(parse_chapter_number("toc"), None);
    }

    #[test]
    fn ratio_only_defined_for_condensed_with_nonzero_original() {
        let outcome = ChapterOutcome::Condensed {
            family: ApiFamily::Gemini,
            original_chars: 1000,
            condensed_chars: 300,
            chunks: 1,
            retries: 0,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(outcome.ratio(), Some(0.3));

        let skipped = ChapterOutcome::Skipped { reason: SkipReason::CacheHit };
        assert_eq!(skipped.ratio(), None);
    }

    #[test]
    fn skipped_and_condensed_count_as_success() {
        let skipped = ChapterOutcome::Skipped { reason: SkipReason::Empty };
        let failed = ChapterOutcome::Failed { error: "boom".into(), retries: 2 };
        assert!(skipped.is_success());
        assert!(!failed.is_success());
    }
}

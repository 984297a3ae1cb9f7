//! Per-chapter processing: the decision tree from skip-check through
//! condensation.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;

use crate::adapter::{self, request::GenerationParams};
use crate::cache::{self, CacheEntry};
use crate::chunk;
use crate::job::{ApiFamily, ChapterJob, ChapterOutcome, SkipReason};
use crate::pool::{CredentialPool, ErrorKind};
use crate::prompt::PromptTemplates;

/// Output below this length, or containing either marker in its first 100
/// chars, is not treated as a prior successful run (stale/failed output).
const MIN_VALID_OUTPUT_BYTES: usize = 300;
const ERROR_MARKERS: [&str; 2] = ["错误", "失败"];
const SHORT_INPUT_THRESHOLD: usize = 100;

pub struct RatioTargets {
    pub min_percent: u32,
    pub max_percent: u32,
}

/// Everything the pipeline needs that is shared across the whole batch;
/// owned by the driver and borrowed per chapter.
pub struct PipelineContext<'a> {
    pub output_dir: &'a Path,
    pub force_regenerate: bool,
    pub debug: bool,
    pub prompts: &'a PromptTemplates,
    pub ratios: &'a RatioTargets,
    pub params: &'a GenerationParams,
    pub http_client: &'a reqwest::Client,
    pub rt: &'a tokio::runtime::Runtime,
}

pub fn process_chapter(job: &ChapterJob, family: ApiFamily, pool: &CredentialPool, ctx: &PipelineContext) -> ChapterOutcome {
    let start = Instant::now();
    let chapter_filename = job
        .input_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    // 1. Skip check.
    if !ctx.force_regenerate {
        if let Ok(existing) = std::fs::read(&job.output_path) {
            if existing.len() >= MIN_VALID_OUTPUT_BYTES && !has_error_marker(&existing) {
                return ChapterOutcome::Skipped { reason: SkipReason::AlreadyDone };
            }
        }
    }
    let _ = std::fs::remove_file(&job.output_path);

    // 2. Read with encoding fallback.
    let raw_bytes = match std::fs::read(&job.input_path) {
        Ok(bytes) => bytes,
        Err(e) => return fail_with_stub(job, ctx, &format!("could not read input file: {e}"), 0),
    };
    let text = match decode_with_fallback(&raw_bytes) {
        Some(t) => t,
        None => return fail_with_stub(job, ctx, "could not decode input with any known encoding", 0),
    };

    // 3. Empty check.
    if text.trim().is_empty() {
        return ChapterOutcome::Skipped { reason: SkipReason::Empty };
    }

    let content_hash = cache::hash_bytes(&raw_bytes);

    // 4. Cache check.
    if !ctx.force_regenerate {
        if let Some(entry) = cache::read_valid(ctx.output_dir, &chapter_filename, &content_hash) {
            if std::fs::write(&job.output_path, &entry.condensed_content).is_ok() {
                return ChapterOutcome::Skipped { reason: SkipReason::CacheHit };
            }
        }
    }

    // 5. Directory-file check.
    if is_directory_file(&text) {
        if std::fs::write(&job.output_path, &text).is_ok() {
            return ChapterOutcome::Skipped { reason: SkipReason::Directory };
        }
    }

    // 6. Short-input check.
    if text.chars().count() < SHORT_INPUT_THRESHOLD {
        if std::fs::write(&job.output_path, &text).is_ok() {
            return ChapterOutcome::Skipped { reason: SkipReason::ShortInput };
        }
    }

    // 7. Condense.
    condense_chapter(job, family, pool, ctx, &text, &content_hash, start)
}

fn condense_chapter(
    job: &ChapterJob,
    family: ApiFamily,
    pool: &CredentialPool,
    ctx: &PipelineContext,
    text: &str,
    content_hash: &str,
    start: Instant,
) -> ChapterOutcome {
    let chunks = chunk::split_into_chunks(text);
    let total_chunks = chunks.len();
    let mut condensed_chunks = Vec::with_capacity(total_chunks);
    let mut total_retries = 0u32;

    for (index, piece) in chunks.iter().enumerate() {
        let chunk_meta = if total_chunks > 1 { Some((index, total_chunks)) } else { None };
        let system_prompt = match chunk_meta {
            Some((i, n)) => {
                let prefix = ctx.prompts.render_chunk_prefix(i, n);
                format!("{prefix}\n{}", ctx.prompts.render_system_prompt(ctx.ratios.min_percent, ctx.ratios.max_percent))
            }
            None => ctx.prompts.render_system_prompt(ctx.ratios.min_percent, ctx.ratios.max_percent),
        };

        match condense_one_chunk(piece, family, pool, ctx, &system_prompt, &mut total_retries) {
            Some(result) => condensed_chunks.push(result),
            None => {
                return fail_with_stub(job, ctx, "exhausted retries for a chunk", total_retries);
            }
        }
    }

    let condensed_text = chunk::join_chunks(&condensed_chunks);
    if std::fs::write(&job.output_path, &condensed_text).is_err() {
        return fail_with_stub(job, ctx, "could not write output file", total_retries);
    }

    let entry = CacheEntry {
        content_hash: content_hash.to_string(),
        condensed_content: condensed_text.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        original_length: text.chars().count(),
        condensed_length: condensed_text.chars().count(),
    };
    let _ = cache::write(ctx.output_dir, &job_filename(job), &entry);

    ChapterOutcome::Condensed {
        family,
        original_chars: text.chars().count(),
        condensed_chars: condensed_text.chars().count(),
        chunks: total_chunks,
        retries: total_retries,
        elapsed: start.elapsed(),
    }
}

/// Up to 3 adapter attempts with fresh credentials each time, per §4.3 step 7.
fn condense_one_chunk(
    text: &str,
    family: ApiFamily,
    pool: &CredentialPool,
    ctx: &PipelineContext,
    system_prompt: &str,
    total_retries: &mut u32,
) -> Option<String> {
    const MAX_PIPELINE_ATTEMPTS: u32 = 3;

    for attempt in 0..MAX_PIPELINE_ATTEMPTS {
        if attempt > 0 {
            *total_retries += 1;
        }
        let key = match pool.acquire() {
            Ok(k) => k,
            Err(_) => return None,
        };

        let credential = match find_credential_snapshot(pool, &key) {
            Some(c) => c,
            None => continue,
        };

        let result = ctx.rt.block_on(adapter::condense(
            ctx.http_client,
            text,
            family,
            &credential,
            system_prompt,
            ctx.params,
            ctx.debug,
        ));

        match result {
            Ok(rewritten) => {
                pool.report_success(&key);
                return Some(rewritten);
            }
            Err(err) => {
                let kind = err.as_pool_error_kind();
                pool.report_error(&key, kind);
                if ctx.debug {
                    eprintln!("DEBUG: chunk attempt failed ({err}); kind={kind:?}", kind = describe_kind(kind));
                }
            }
        }
    }
    None
}

fn describe_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::RateLimit => "rate_limit",
        ErrorKind::InvalidKey => "invalid_key",
        ErrorKind::General => "general",
    }
}

/// The adapter needs the credential's static fields (key/base_url/model);
/// the pool only exposes those through its internal lock. Since `acquire`
/// already selected this key, re-deriving a lightweight snapshot here keeps
/// the adapter decoupled from the pool's lock guard lifetime.
fn find_credential_snapshot(pool: &CredentialPool, key: &str) -> Option<crate::pool::Credential> {
    pool.credential_snapshot(key)
}

fn has_error_marker(bytes: &[u8]) -> bool {
    let prefix_len = bytes.len().min(300); // generous slice to cover multi-byte UTF-8 boundaries
    let text = String::from_utf8_lossy(&bytes[..prefix_len]);
    let head: String = text.chars().take(100).collect();
    ERROR_MARKERS.iter().any(|marker| head.contains(marker))
}

fn decode_with_fallback(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }
    for encoding in [encoding_rs::GBK, encoding_rs::GB18030, encoding_rs::UTF_16LE, encoding_rs::WINDOWS_1252] {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Some(text.into_owned());
        }
    }
    // Last resort: latin-1 never reports errors (every byte is a valid code point).
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    Some(text.into_owned())
}

fn directory_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("第.{1,6}章|第.{1,6}回|第.{1,6}节|序章|序幕|引子|尾声").unwrap())
}

/// Classifies a table-of-contents page: short lines, many chapter-heading
/// lines, no prose-length lines.
fn is_directory_file(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 5 {
        return false;
    }
    if lines.iter().any(|l| l.chars().count() > 50) {
        return false;
    }

    let non_blank: Vec<&&str> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
    if non_blank.is_empty() {
        return false;
    }

    let matches = non_blank.iter().filter(|l| directory_pattern().is_match(l)).count();
    (matches as f64 / non_blank.len() as f64) > 0.2
}

fn job_filename(job: &ChapterJob) -> String {
    job.input_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

fn fail_with_stub(job: &ChapterJob, ctx: &PipelineContext, reason: &str, retries: u32) -> ChapterOutcome {
    let stub = format!("# 脱水处理失败\n{}\n{reason}\n", chrono::Utc::now().to_rfc3339());
    let _ = std::fs::write(&job.output_path, stub);
    if ctx.debug {
        eprintln!("DEBUG: chapter {} failed: {reason}", job.input_path.display());
    }
    ChapterOutcome::Failed { error: reason.to_string(), retries }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_input_decodes_directly() {
        assert_eq!(decode_with_fallback("hello".as_bytes()), Some("hello".to_string()));
    }

    #[test]
    fn short_input_is_detected() {
        assert!("a".repeat(50).chars().count() < SHORT_INPUT_THRESHOLD);
    }

    #[test]
    fn error_marker_detection_looks_only_at_head() {
        let mut content = vec![b'a'; 400];
        let marker = "错误".as_bytes();
        content[0..marker.len()].copy_from_slice(marker);
        assert!(has_error_marker(&content));
    }

    #[test]
    fn clean_output_has_no_error_marker() {
        let content = vec![b'a'; 400];
        assert!(!has_error_marker(&content));
    }

    #[test]
    fn directory_file_classification_matches_toc_shape() {
        let mut lines = Vec::new();
        for i in 1..=40 {
            if i % 4 == 0 {
                lines.push(format!("第{i}章 风起"));
            } else {
                lines.push(format!("章节{i}"));
            }
        }
        let text = lines.join("\n");
        assert!(is_directory_file(&text));
    }

    #[test]
    fn ordinary_prose_is_not_classified_as_directory() {
        let text = "this is a long line of ordinary prose that goes on and on and describes a scene.\n".repeat(10);
        assert!(!is_directory_file(&text));
    }

    #[test]
    fn directory_file_requires_minimum_line_count() {
        let text = "第1章\n第2章\n第3章";
        assert!(!is_directory_file(text));
    }
}

//! End-to-end pipeline scenarios that don't require a live LLM endpoint:
//! the skip check, cache hit, directory-file passthrough, and short-input
//! passthrough branches of the chapter decision tree all return before the
//! adapter is ever invoked.

use std::fs;

use novel_condenser::adapter::request::GenerationParams;
use novel_condenser::cache::{self, CacheEntry};
use novel_condenser::job::{ChapterJob, ChapterOutcome};
use novel_condenser::pipeline::{process_chapter, PipelineContext, RatioTargets};
use novel_condenser::pool::{Credential, CredentialPool, ErrorKind};
use novel_condenser::prompt::PromptTemplates;

fn context<'a>(
    output_dir: &'a std::path::Path,
    force_regenerate: bool,
    prompts: &'a PromptTemplates,
    ratios: &'a RatioTargets,
    params: &'a GenerationParams,
    http_client: &'a reqwest::Client,
    rt: &'a tokio::runtime::Runtime,
) -> PipelineContext<'a> {
    PipelineContext { output_dir, force_regenerate, debug: false, prompts, ratios, params, http_client, rt }
}

fn job(input_path: std::path::PathBuf, output_path: std::path::PathBuf) -> ChapterJob {
    ChapterJob { index: 0, input_path, output_path, chapter_number: Some(1) }
}

/// S4 — a prior successful run already left a valid output file behind.
#[test]
fn existing_valid_output_is_skipped_without_any_http_call() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("ch1.txt");
    fs::write(&input_path, "original chapter text").unwrap();

    let output_path = output_dir.path().join("ch1.txt");
    fs::write(&output_path, "a".repeat(400)).unwrap();

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    let pool = CredentialPool::new(Vec::new(), 20, false);
    let outcome = process_chapter(&job(input_path, output_path.clone()), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Skipped { .. }));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "a".repeat(400));
}

/// S4 — cache sidecar present, output missing: the cached text is written
/// and no HTTP call is made.
#[test]
fn cache_hit_writes_condensed_content_without_an_http_call() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("ch1.txt");
    let raw = b"original chapter text that is long enough to not be a short passthrough case at all, really";
    fs::write(&input_path, raw).unwrap();
    let output_path = output_dir.path().join("ch1.txt");

    let hash = cache::hash_bytes(raw);
    let entry = CacheEntry {
        content_hash: hash,
        condensed_content: "the cached condensed text".to_string(),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        original_length: raw.len(),
        condensed_length: 25,
    };
    cache::write(output_dir.path(), "ch1.txt", &entry).unwrap();

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    let pool = CredentialPool::new(Vec::new(), 20, false);
    let outcome = process_chapter(&job(input_path, output_path.clone()), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Skipped { .. }));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "the cached condensed text");
}

/// S5 — a table-of-contents page is copied through verbatim.
#[test]
fn directory_file_passes_through_verbatim() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let mut lines = Vec::new();
    for i in 1..=40 {
        if i % 3 == 0 {
            lines.push(format!("第{i}章 风雨"));
        } else {
            lines.push(format!("条目{i}"));
        }
    }
    let text = lines.join("\n");

    let input_path = input_dir.path().join("toc.txt");
    fs::write(&input_path, &text).unwrap();
    let output_path = output_dir.path().join("toc.txt");

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    let pool = CredentialPool::new(Vec::new(), 20, false);
    let outcome = process_chapter(&job(input_path, output_path.clone()), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Skipped { .. }));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), text);
}

/// Short inputs (< 100 chars) pass through unchanged instead of being sent
/// to the adapter.
#[test]
fn short_input_passes_through_verbatim() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let text = "too short to condense";
    let input_path = input_dir.path().join("ch1.txt");
    fs::write(&input_path, text).unwrap();
    let output_path = output_dir.path().join("ch1.txt");

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    let pool = CredentialPool::new(Vec::new(), 20, false);
    let outcome = process_chapter(&job(input_path, output_path.clone()), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Skipped { .. }));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), text);
}

/// Empty input is classified as empty and never reaches condensation.
#[test]
fn empty_input_is_classified_as_empty() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("ch1.txt");
    fs::write(&input_path, "   \n\n   ").unwrap();
    let output_path = output_dir.path().join("ch1.txt");

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    let pool = CredentialPool::new(Vec::new(), 20, false);
    let outcome = process_chapter(&job(input_path, output_path), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Skipped { reason: novel_condenser::job::SkipReason::Empty }));
}

/// A stale output carrying the failure stub's error marker is not treated
/// as a valid prior run: the pipeline deletes it and falls through to
/// condensation (here, with a pre-exhausted credential pool, so it fails
/// fast, proving the stale stub did not short-circuit as `skipped`).
#[test]
fn stale_failure_stub_is_not_treated_as_a_valid_prior_run() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("ch1.txt");
    fs::write(&input_path, "a".repeat(500)).unwrap();
    let output_path = output_dir.path().join("ch1.txt");
    let mut stub = "# 脱水处理失败\n".to_string();
    stub.push_str(&"x".repeat(400));
    fs::write(&output_path, stub).unwrap();

    let prompts = PromptTemplates::default();
    let ratios = RatioTargets { min_percent: 30, max_percent: 50 };
    let params = GenerationParams::default();
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let ctx = context(output_dir.path(), false, &prompts, &ratios, &params, &client, &rt);

    // A session-fatal credential makes `acquire()` fail immediately instead
    // of polling for the full 30-second acquire timeout.
    let credential = Credential::new("dead-key", None, None, 10);
    let pool = CredentialPool::new(vec![credential], 20, false);
    for _ in 0..20 {
        pool.report_error("dead-key", ErrorKind::General);
    }
    assert!(pool.is_session_fatal());

    let outcome = process_chapter(&job(input_path, output_path), novel_condenser::job::ApiFamily::Gemini, &pool, &ctx);

    assert!(matches!(outcome, ChapterOutcome::Failed { .. }));
}

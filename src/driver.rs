//! Batch driver: a fixed worker-thread pool that runs the chapter pipeline
//! to completion for every queued chapter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam::queue::SegQueue;

use crate::adapter::request::GenerationParams;
use crate::job::{ApiFamily, ChapterJob, ChapterOutcome};
use crate::pipeline::{self, PipelineContext, RatioTargets};
use crate::pool::CredentialPool;
use crate::prompt::PromptTemplates;
use crate::stats::StatisticsLedger;

/// Which pool(s) a batch draws from.
#[derive(Clone)]
pub enum DispatchMode {
    Single(ApiFamily),
    Mixed,
}

/// Shared, read-only configuration every worker needs, plus the pools it
/// dispatches into. Built once by the caller (main) and handed to `run`.
pub struct DriverConfig {
    pub output_dir: PathBuf,
    pub force_regenerate: bool,
    pub debug: bool,
    pub prompts: PromptTemplates,
    pub ratios: RatioTargets,
    pub params: GenerationParams,
    pub gemini_pool: Option<Arc<CredentialPool>>,
    pub openai_pool: Option<Arc<CredentialPool>>,
}

pub struct RunReport {
    pub success_count: usize,
    pub failed_paths: Vec<PathBuf>,
}

/// Progress callback invoked after each chapter completes. Never called
/// while a pool or ledger lock is held.
pub type ProgressFn = dyn Fn(usize, usize, Option<String>) + Send + Sync;

pub fn run(
    jobs: Vec<ChapterJob>,
    mode: DispatchMode,
    worker_count: usize,
    config: Arc<DriverConfig>,
    ledger: Arc<StatisticsLedger>,
    progress: Arc<ProgressFn>,
    stop: Arc<AtomicBool>,
) -> RunReport {
    let total = jobs.len();
    let worker_count = effective_worker_count(worker_count, total);

    let queue = Arc::new(SegQueue::new());
    for job in jobs {
        queue.push(job);
    }

    let completed = Arc::new(AtomicUsize::new(0));
    let failed_paths: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
    let success_count = Arc::new(AtomicUsize::new(0));

    std::thread::scope(|scope| {
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let config = Arc::clone(&config);
            let ledger = Arc::clone(&ledger);
            let progress = Arc::clone(&progress);
            let stop = Arc::clone(&stop);
            let completed = Arc::clone(&completed);
            let failed_paths = Arc::clone(&failed_paths);
            let success_count = Arc::clone(&success_count);
            let mode = mode.clone();

            scope.spawn(move || {
                worker_loop(
                    worker_id, queue, config, ledger, progress, stop, completed, total, failed_paths, success_count, mode,
                );
            });
        }
    });

    RunReport {
        success_count: success_count.load(Ordering::Relaxed),
        failed_paths: failed_paths.lock().unwrap().clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    queue: Arc<SegQueue<ChapterJob>>,
    config: Arc<DriverConfig>,
    ledger: Arc<StatisticsLedger>,
    progress: Arc<ProgressFn>,
    stop: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
    total: usize,
    failed_paths: Arc<Mutex<Vec<PathBuf>>>,
    success_count: Arc<AtomicUsize>,
    mode: DispatchMode,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: worker {worker_id} could not start its runtime: {e}");
            return;
        }
    };
    let http_client = reqwest::Client::new();

    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let Some(job) = queue.pop() else { return };

        let Some(family) = select_family(&mode, &config, job.index) else {
            mark_remainder_failed(&job, &ledger, &failed_paths, &completed, total, &progress);
            continue;
        };

        let pool = match family {
            ApiFamily::Gemini => config.gemini_pool.as_ref(),
            ApiFamily::OpenAi => config.openai_pool.as_ref(),
        };
        let Some(pool) = pool else {
            mark_remainder_failed(&job, &ledger, &failed_paths, &completed, total, &progress);
            continue;
        };

        let ctx = PipelineContext {
            output_dir: &config.output_dir,
            force_regenerate: config.force_regenerate,
            debug: config.debug,
            prompts: &config.prompts,
            ratios: &config.ratios,
            params: &config.params,
            http_client: &http_client,
            rt: &rt,
        };

        let outcome = pipeline::process_chapter(&job, family, pool, &ctx);
        record_outcome(job, outcome, &ledger, &failed_paths, &success_count, &completed, total, &progress);
    }
}

fn select_family(mode: &DispatchMode, config: &DriverConfig, chapter_index: usize) -> Option<ApiFamily> {
    match mode {
        DispatchMode::Single(family) => Some(*family),
        DispatchMode::Mixed => {
            let gemini_live = config.gemini_pool.as_ref().is_some_and(|p| !p.is_session_fatal());
            let openai_live = config.openai_pool.as_ref().is_some_and(|p| !p.is_session_fatal());
            match (gemini_live, openai_live) {
                (true, true) => Some(if chapter_index % 2 == 0 { ApiFamily::Gemini } else { ApiFamily::OpenAi }),
                (true, false) => Some(ApiFamily::Gemini),
                (false, true) => Some(ApiFamily::OpenAi),
                (false, false) => None,
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn record_outcome(
    job: ChapterJob,
    outcome: ChapterOutcome,
    ledger: &StatisticsLedger,
    failed_paths: &Mutex<Vec<PathBuf>>,
    success_count: &AtomicUsize,
    completed: &AtomicUsize,
    total: usize,
    progress: &ProgressFn,
) {
    let retries = match &outcome {
        ChapterOutcome::Condensed { retries, .. } => *retries,
        ChapterOutcome::Failed { retries, .. } => *retries,
        ChapterOutcome::Skipped { .. } => 0,
    };
    let is_success = outcome.is_success();
    let status_label = match &outcome {
        ChapterOutcome::Condensed { .. } => Some("condensed".to_string()),
        ChapterOutcome::Skipped { .. } => Some("skipped".to_string()),
        ChapterOutcome::Failed { error, .. } => Some(format!("failed: {error}")),
    };

    ledger.record(job.input_path.clone(), &outcome, retries);
    if is_success {
        success_count.fetch_add(1, Ordering::Relaxed);
    } else {
        failed_paths.lock().unwrap().push(job.input_path.clone());
    }

    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    progress(done, total, status_label);
}

fn mark_remainder_failed(
    job: &ChapterJob,
    ledger: &StatisticsLedger,
    failed_paths: &Mutex<Vec<PathBuf>>,
    completed: &AtomicUsize,
    total: usize,
    progress: &ProgressFn,
) {
    let outcome = ChapterOutcome::Failed { error: "all credential pools for this chapter are exhausted".to_string(), retries: 0 };
    ledger.record(job.input_path.clone(), &outcome, 0);
    failed_paths.lock().unwrap().push(job.input_path.clone());
    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    progress(done, total, Some("pool exhausted".to_string()));
}

/// Falls back to sequential processing when the caller asks for fewer than
/// 2 workers or there are fewer than 2 chapters to process.
fn effective_worker_count(requested: usize, total_chapters: usize) -> usize {
    if requested < 2 || total_chapters < 2 {
        1
    } else {
        requested.min(total_chapters)
    }
}

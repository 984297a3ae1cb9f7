//! novel-condenser: concurrent batch LLM dispatcher for novel chapters.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use novel_condenser::adapter::{self, AdapterError};
use novel_condenser::config::cli::{ApiMode, Cli};
use novel_condenser::config::{loader, validator, Config};
use novel_condenser::driver::{self, DispatchMode, DriverConfig};
use novel_condenser::job::{parse_chapter_number, ApiFamily, ChapterJob};
use novel_condenser::output::{json as json_output, text};
use novel_condenser::pool::CredentialPool;
use novel_condenser::stats::StatisticsLedger;

fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = cli.validate() {
        eprintln!("ERROR: {e}");
        std::process::exit(2);
    }

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    if cli.create_config {
        let path = cli.config.clone().unwrap_or_else(|| PathBuf::from(loader::CONFIG_FILENAME));
        loader::write_example_config(&path)?;
        println!("Wrote example config to {}", path.display());
        return Ok(0);
    }

    let config = loader::load_config(cli.config.as_deref())?;
    validator::validate_config(&config)?;
    let merged = loader::merge_credentials(&config, cli);

    if cli.check_api {
        return Ok(check_api(&config, &merged));
    }

    let required = loader::required_families(cli.api);
    validator::validate_pools_nonempty(merged.gemini.len(), merged.openai.len(), required)?;

    let input = cli.input.clone().expect("validated by Cli::validate");
    let output_dir = cli.output.clone().unwrap_or_else(|| input.join("condensed"));
    std::fs::create_dir_all(&output_dir)?;

    let jobs = collect_jobs(&input, &output_dir, cli)?;
    if jobs.is_empty() {
        println!("No chapters matched the given input/pattern/range.");
        return Ok(0);
    }

    let gemini_pool = if merged.gemini.is_empty() {
        None
    } else {
        Some(Arc::new(CredentialPool::new(merged.gemini.clone(), config.max_rpm, cli.debug)))
    };
    let openai_pool = if merged.openai.is_empty() {
        None
    } else {
        Some(Arc::new(CredentialPool::new(merged.openai.clone(), config.max_rpm, cli.debug)))
    };

    let mode = match cli.api {
        ApiMode::Gemini => DispatchMode::Single(ApiFamily::Gemini),
        ApiMode::Openai => DispatchMode::Single(ApiFamily::OpenAi),
        ApiMode::Mixed => DispatchMode::Mixed,
    };

    let worker_count = if cli.sequential {
        1
    } else {
        cli.max_workers.unwrap_or_else(|| default_worker_count(&gemini_pool, &openai_pool))
    };

    text::print_configuration(&input, &output_dir, api_mode_label(cli.api), worker_count, jobs.len(), cli.force);

    let driver_config = Arc::new(DriverConfig {
        output_dir: output_dir.clone(),
        force_regenerate: cli.force,
        debug: cli.debug,
        prompts: config.resolved_prompts(),
        ratios: config.ratio_targets(),
        params: config.generation_params(),
        gemini_pool,
        openai_pool,
    });

    let ledger = Arc::new(StatisticsLedger::new());
    let stop = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(move |done: usize, total: usize, status: Option<String>| match status {
        Some(s) => println!("[{done}/{total}] {s}"),
        None => println!("[{done}/{total}]"),
    });

    let report = driver::run(jobs, mode, worker_count, driver_config, Arc::clone(&ledger), progress, stop);
    ledger.mark_finished();
    let summary = ledger.summary();

    text::print_summary(&summary);

    let summary_path = output_dir.join("summary.json");
    json_output::write_summary(&summary_path, &summary)?;

    if report.failed_paths.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn api_mode_label(mode: ApiMode) -> &'static str {
    match mode {
        ApiMode::Gemini => "gemini",
        ApiMode::Openai => "openai",
        ApiMode::Mixed => "mixed",
    }
}

fn default_worker_count(gemini_pool: &Option<Arc<CredentialPool>>, openai_pool: &Option<Arc<CredentialPool>>) -> usize {
    let gemini = gemini_pool.as_ref().map(|p| p.max_concurrency()).unwrap_or(0);
    let openai = openai_pool.as_ref().map(|p| p.max_concurrency()).unwrap_or(0);
    (gemini + openai).max(1)
}

/// Walks `input` for `.txt` files, applies `--pattern`/`--range`/`--test`
/// filtering, sorts by parsed chapter number (falling back to filename), and
/// assigns the resulting batch-order index used for mixed-mode dispatch.
fn collect_jobs(input: &Path, output_dir: &Path, cli: &Cli) -> anyhow::Result<Vec<ChapterJob>> {
    let pattern = cli.pattern.as_deref().map(regex::Regex::new).transpose()?;
    let range = cli.range.as_deref().map(novel_condenser::config::cli::parse_range).transpose()?;

    let mut candidates: Vec<(PathBuf, Option<u32>)> = Vec::new();
    if input.is_dir() {
        for entry in std::fs::read_dir(input)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            if let Some(re) = &pattern {
                if !re.is_match(&stem) {
                    continue;
                }
            }
            let chapter_number = parse_chapter_number(&stem);
            if let Some((start, end)) = range {
                match chapter_number {
                    Some(n) if n >= start && n <= end => {}
                    _ => continue,
                }
            }
            candidates.push((path, chapter_number));
        }
    } else {
        candidates.push((input.to_path_buf(), None));
    }

    candidates.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.0.cmp(&b.0)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    if cli.test {
        candidates.truncate(5);
    }

    Ok(candidates
        .into_iter()
        .enumerate()
        .map(|(index, (path, chapter_number))| {
            let filename = path.file_name().expect("walked entries always have a filename");
            ChapterJob {
                index,
                input_path: path.clone(),
                output_path: output_dir.join(filename),
                chapter_number,
            }
        })
        .collect())
}

/// `--check-api`: one lightweight request per configured credential, no
/// chapter processing. Prints a pass/fail line per credential and returns
/// the process exit code (non-zero if any credential failed).
fn check_api(config: &Config, merged: &loader::MergedCredentials) -> i32 {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: could not start a runtime to check credentials: {e}");
            return 1;
        }
    };
    let client = reqwest::Client::new();
    let params = config.generation_params();
    let prompts = config.resolved_prompts();
    let system_prompt = prompts.render_system_prompt(30, 50);

    let mut all_ok = true;
    for (family, credential) in merged
        .gemini
        .iter()
        .map(|c| (ApiFamily::Gemini, c))
        .chain(merged.openai.iter().map(|c| (ApiFamily::OpenAi, c)))
    {
        let result = rt.block_on(adapter::condense(&client, "ping", family, credential, &system_prompt, &params, false));
        match result {
            Ok(_) => println!("OK   {} {}", family.as_str(), redact(&credential.key)),
            Err(AdapterError::InvalidKey(reason)) => {
                all_ok = false;
                println!("FAIL {} {} (invalid key: {reason})", family.as_str(), redact(&credential.key));
            }
            Err(e) => {
                all_ok = false;
                println!("FAIL {} {} ({e})", family.as_str(), redact(&credential.key));
            }
        }
    }

    if all_ok {
        0
    } else {
        1
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &key[key.len() - 4..])
    }
}

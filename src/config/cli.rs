//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which API family (or families) a batch draws credentials from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApiMode {
    Gemini,
    Openai,
    Mixed,
}

/// novel-condenser - concurrent batch LLM dispatcher for novel chapters
#[derive(Parser, Debug)]
#[command(name = "novel-condenser")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input path: a directory of chapter .txt files
    #[arg(value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output directory for condensed chapters (default: <input>/condensed)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Filename glob/regex pattern restricting which chapters are processed
    #[arg(short = 'p', long)]
    pub pattern: Option<String>,

    /// Chapter number range to process, e.g. "10-25"
    #[arg(short = 'r', long, value_name = "START-END")]
    pub range: Option<String>,

    /// Path to the JSON config file (overrides auto-discovery)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Override: use a single Gemini credential with this key
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Override: use a single OpenAI credential with this key
    #[arg(long)]
    pub openai_key: Option<String>,

    /// Which API family (or families) to draw credentials from
    #[arg(long, value_enum, default_value = "gemini")]
    pub api: ApiMode,

    /// Force sequential processing (one chapter at a time)
    #[arg(short = 's', long)]
    pub sequential: bool,

    /// Maximum worker threads (default: derived from the credential pool's capacity)
    #[arg(short = 'm', long)]
    pub max_workers: Option<usize>,

    /// Test mode: process only the first 5 chapters
    #[arg(short = 't', long)]
    pub test: bool,

    /// Force regeneration even if a valid output or cache entry exists
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Print verbose debug output during the run
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Write a commented example JSON config to disk and exit
    #[arg(long)]
    pub create_config: bool,

    /// Run one lightweight request per configured credential and report validity, without processing chapters
    #[arg(long)]
    pub check_api: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Cheap structural checks that don't require the config file or
    /// filesystem; full validation happens in `config::validator` once the
    /// JSON config and CLI are merged.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.create_config && !self.check_api && self.input.is_none() {
            anyhow::bail!("an input path is required unless --create-config or --check-api is given");
        }
        if let Some(range) = &self.range {
            parse_range(range)?;
        }
        Ok(())
    }
}

/// Parses a "START-END" chapter range, e.g. "10-25".
pub fn parse_range(range: &str) -> anyhow::Result<(u32, u32)> {
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("range must look like START-END, got '{range}'"))?;
    let start: u32 = start.trim().parse().map_err(|_| anyhow::anyhow!("invalid range start: '{start}'"))?;
    let end: u32 = end.trim().parse().map_err(|_| anyhow::anyhow!("invalid range end: '{end}'"))?;
    if start > end {
        anyhow::bail!("range start {start} is greater than end {end}");
    }
    Ok((start, end))
}

//! JSON config discovery and CLI-override merging.
//!
//! Replaces the teacher's `config::toml` module: this system's config format
//! is JSON (§6), but the discovery-then-merge shape is the same — search a
//! fixed list of locations for a config file, parse it (or fall back to
//! defaults if none is found), then let CLI flags override specific fields.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pool::{Credential, DEFAULT_KEY_RPM};

use super::cli::{ApiMode, Cli};
use super::Config;

pub const CONFIG_FILENAME: &str = "novel_condenser_config.json";

/// Searches, in order: the running executable's directory, the nearest
/// ancestor of the working directory that contains a `Cargo.toml` ("project
/// root"), the working directory itself, and `$HOME/.config/novel-condenser/`.
/// Returns the first path that exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(CONFIG_FILENAME));
        }
    }
    if let Some(root) = find_project_root() {
        candidates.push(root.join(CONFIG_FILENAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILENAME));
    }
    if let Some(home) = std::env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".config").join("novel-condenser").join(CONFIG_FILENAME));
    }

    candidates.into_iter().find(|p| p.is_file())
}

fn find_project_root() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        if dir.join("Cargo.toml").is_file() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Loads the config from `explicit_path` if given, otherwise from
/// `discover_config_path()`. Missing files are not an error — a batch can
/// run on pure CLI overrides (`-k`/`--openai-key`) with the rest defaulted.
pub fn load_config(explicit_path: Option<&Path>) -> crate::Result<Config> {
    let path = match explicit_path {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config_path(),
    };

    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Writes a commented example config to `path` for `--create-config`.
/// JSON has no native comments, so the example leans on descriptive key
/// names and a companion `_comment` field, the way hand-authored example
/// configs for JSON-only tools conventionally do.
pub fn write_example_config(path: &Path) -> crate::Result<()> {
    let example = serde_json::json!({
        "_comment": "novel-condenser config. Unknown keys are ignored.",
        "gemini_api": [
            {"key": "YOUR_GEMINI_API_KEY", "model": "gemini-1.5-flash", "rpm": 5}
        ],
        "openai_api": [],
        "max_rpm": 20,
        "min_condensation_ratio": 30,
        "max_condensation_ratio": 50,
        "target_condensation_ratio": 40,
        "llm_generation_params": {
            "temperature": 0.2,
            "top_p": 0.8,
            "top_k": 40,
            "max_tokens": 8192,
            "timeout": {"official_api": 120, "third_party_api": 180},
            "max_retries": 3,
            "retry_delay": 5
        },
        "prompt_templates": {
            "novel_condenser": crate::prompt::PromptTemplates::default().novel_condenser,
            "chunk_prefix": crate::prompt::PromptTemplates::default().chunk_prefix
        },
        "customer_prompt": serde_json::Value::Null
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&example)?)?;
    Ok(())
}

/// Outcome of merging CLI key overrides into the config-supplied pools.
pub struct MergedCredentials {
    pub gemini: Vec<Credential>,
    pub openai: Vec<Credential>,
}

/// §6 / §9: `-k`/`--openai-key` each replace only their own family's pool
/// with a single synthetic credential; the other family's config-file pool,
/// if any, is left untouched. This is the original tool's behavior,
/// preserved rather than "fixed" — a user who overrides one family is
/// usually testing it in isolation while leaving the other intact.
pub fn merge_credentials(config: &Config, cli: &Cli) -> MergedCredentials {
    let gemini = match &cli.key {
        Some(key) => vec![Credential::new(key.clone(), None, None, DEFAULT_KEY_RPM)],
        None => config.gemini_credentials(),
    };
    let openai = match &cli.openai_key {
        Some(key) => vec![Credential::new(key.clone(), None, None, DEFAULT_KEY_RPM)],
        None => config.openai_credentials(),
    };
    MergedCredentials { gemini, openai }
}

/// Which families a given `--api` selection needs a non-empty pool for.
pub fn required_families(mode: ApiMode) -> &'static [&'static str] {
    match mode {
        ApiMode::Gemini => &["gemini"],
        ApiMode::Openai => &["openai"],
        ApiMode::Mixed => &["gemini", "openai"],
    }
}

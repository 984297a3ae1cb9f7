//! Configuration validation.
//!
//! Kept from the teacher: free `validate_*` functions returning
//! `anyhow::Result<()>`, `anyhow::bail!` for hard violations, `eprintln!`
//! warnings for soft ones that don't block the run.

use anyhow::{bail, Result};

use super::{Config, CredentialConfig};

/// Full validation pass over a merged config. Credential-pool emptiness is
/// checked separately by the caller once it knows which API family the
/// batch actually needs (`config::loader::required_families`), since an
/// empty OpenAI pool is fine in `--api gemini` mode.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_ratios(config)?;
    validate_rpm(config)?;
    validate_generation_params(config)?;
    for cred in config.gemini_api.iter().chain(config.openai_api.iter()) {
        validate_credential(cred)?;
    }
    Ok(())
}

fn validate_ratios(config: &Config) -> Result<()> {
    if config.min_condensation_ratio == 0 {
        bail!("min_condensation_ratio must be greater than 0");
    }
    if config.max_condensation_ratio > 100 {
        bail!("max_condensation_ratio ({}) cannot exceed 100", config.max_condensation_ratio);
    }
    if config.min_condensation_ratio > config.max_condensation_ratio {
        bail!(
            "min_condensation_ratio ({}) cannot exceed max_condensation_ratio ({})",
            config.min_condensation_ratio,
            config.max_condensation_ratio
        );
    }
    if config.target_condensation_ratio < config.min_condensation_ratio
        || config.target_condensation_ratio > config.max_condensation_ratio
    {
        eprintln!(
            "WARNING: target_condensation_ratio ({}) falls outside [min_condensation_ratio, max_condensation_ratio] ({}, {})",
            config.target_condensation_ratio, config.min_condensation_ratio, config.max_condensation_ratio
        );
    }
    Ok(())
}

fn validate_rpm(config: &Config) -> Result<()> {
    if config.max_rpm == 0 {
        bail!("max_rpm must be greater than 0");
    }
    Ok(())
}

fn validate_credential(cred: &CredentialConfig) -> Result<()> {
    if cred.key.trim().is_empty() {
        bail!("a credential entry has an empty key");
    }
    if let Some(rpm) = cred.rpm {
        if rpm == 0 {
            bail!("credential '{}' has rpm = 0", redact(&cred.key));
        }
    }
    Ok(())
}

fn validate_generation_params(config: &Config) -> Result<()> {
    let params = config.generation_params();
    if !(0.0..=2.0).contains(&params.temperature) {
        eprintln!("WARNING: temperature {} is outside the conventional [0.0, 2.0] range", params.temperature);
    }
    if !(0.0..=1.0).contains(&params.top_p) {
        bail!("top_p must be within [0.0, 1.0], got {}", params.top_p);
    }
    if params.max_tokens == 0 {
        bail!("max_tokens must be greater than 0");
    }
    if params.max_retries == 0 {
        bail!("max_retries must be at least 1");
    }
    Ok(())
}

/// Bails if the pool(s) required by the requested API mode would end up
/// empty. Called after CLI key overrides are merged in, so `-k`/
/// `--openai-key` count as populating their family.
pub fn validate_pools_nonempty(gemini_len: usize, openai_len: usize, required: &[&str]) -> Result<()> {
    for family in required {
        let len = match *family {
            "gemini" => gemini_len,
            "openai" => openai_len,
            other => bail!("unknown API family '{other}'"),
        };
        if len == 0 {
            bail!("no credentials configured for the '{family}' API family; add one to the config file or pass the matching CLI key override");
        }
    }
    Ok(())
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &key[key.len() - 4..])
    }
}

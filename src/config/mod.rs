//! Configuration: the JSON file shape, CLI argument parsing, and the
//! validator that rejects impossible combinations before a batch starts.

pub mod cli;
pub mod loader;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::adapter::request::GenerationParams;
use crate::pool::{Credential, DEFAULT_RPM};
use crate::prompt::PromptTemplates;

/// Top-level JSON configuration, per §6 of the specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api: Vec<CredentialConfig>,
    pub openai_api: Vec<CredentialConfig>,
    pub max_rpm: u32,
    pub min_condensation_ratio: u32,
    pub max_condensation_ratio: u32,
    pub target_condensation_ratio: u32,
    pub llm_generation_params: RawGenerationParams,
    pub prompt_templates: PromptTemplates,
    pub customer_prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api: Vec::new(),
            openai_api: Vec::new(),
            max_rpm: 20,
            min_condensation_ratio: 30,
            max_condensation_ratio: 50,
            target_condensation_ratio: 40,
            llm_generation_params: RawGenerationParams::default(),
            prompt_templates: PromptTemplates::default(),
            customer_prompt: None,
        }
    }
}

impl Config {
    /// Resolved generation params, config overrides layered on the documented
    /// defaults (temperature 0.2, top_p 0.8, top_k 40, max_tokens 8192, ...).
    pub fn generation_params(&self) -> GenerationParams {
        self.llm_generation_params.resolve()
    }

    /// Prompt templates with `customer_prompt` applied, if set — it takes
    /// highest priority over `prompt_templates.novel_condenser` per §6.
    pub fn resolved_prompts(&self) -> PromptTemplates {
        let mut templates = self.prompt_templates.clone();
        if let Some(custom) = &self.customer_prompt {
            templates.novel_condenser = custom.clone();
        }
        templates
    }

    pub fn ratio_targets(&self) -> crate::pipeline::RatioTargets {
        crate::pipeline::RatioTargets {
            min_percent: self.min_condensation_ratio,
            max_percent: self.max_condensation_ratio,
        }
    }

    pub fn gemini_credentials(&self) -> Vec<Credential> {
        self.gemini_api.iter().cloned().map(CredentialConfig::into_credential).collect()
    }

    pub fn openai_credentials(&self) -> Vec<Credential> {
        self.openai_api.iter().cloned().map(CredentialConfig::into_credential).collect()
    }
}

/// One entry of `gemini_api`/`openai_api`. Unknown keys are ignored by serde's
/// default behavior (it simply never looks at anything but these fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub key: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub rpm: Option<u32>,
}

impl CredentialConfig {
    pub fn into_credential(self) -> Credential {
        Credential::new(self.key, self.redirect_url, self.model, self.rpm.unwrap_or(DEFAULT_RPM))
    }
}

/// `llm_generation_params` as it appears in the JSON config: every field
/// optional, falling back to `GenerationParams::default()` at resolve time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawGenerationParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<TimeoutConfig>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    pub official_api: Option<u64>,
    pub third_party_api: Option<u64>,
}

impl RawGenerationParams {
    pub fn resolve(&self) -> GenerationParams {
        let defaults = GenerationParams::default();
        let timeout = self.timeout.clone().unwrap_or_default();
        GenerationParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            timeout_official_api: timeout.official_api.unwrap_or(defaults.timeout_official_api),
            timeout_third_party_api: timeout.third_party_api.unwrap_or(defaults.timeout_third_party_api),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
        }
    }
}

//! Request body assembly for each provider family.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::job::ApiFamily;

/// Generation parameters, overridable from the config file's
/// `llm_generation_params` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub timeout_official_api: u64,
    pub timeout_third_party_api: u64,
    pub max_retries: u32,
    pub retry_delay: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_tokens: 8192,
            timeout_official_api: 120,
            timeout_third_party_api: 180,
            max_retries: 3,
            retry_delay: 5,
        }
    }
}

pub fn build_body(family: ApiFamily, model: &str, system_prompt: &str, user_text: &str, params: &GenerationParams) -> Value {
    match family {
        ApiFamily::Gemini => json!({
            "contents": [{
                "parts": [
                    {"text": system_prompt},
                    {"text": user_text},
                ]
            }],
            "generationConfig": {
                "temperature": params.temperature,
                "topK": params.top_k,
                "topP": params.top_p,
                "maxOutputTokens": params.max_tokens,
                "responseMimeType": "text/plain",
                "stopSequences": ["Thinking:"],
            },
            "safetySettings": [{
                "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
                "threshold": "BLOCK_ONLY_HIGH",
            }],
        }),
        ApiFamily::OpenAi => json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_text},
            ],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
            "frequency_penalty": 0,
            "presence_penalty": 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let p = GenerationParams::default();
        assert_eq!(p.temperature, 0.2);
        assert_eq!(p.top_p, 0.8);
        assert_eq!(p.top_k, 40);
        assert_eq!(p.max_tokens, 8192);
    }

    #[test]
    fn gemini_body_has_expected_shape() {
        let params = GenerationParams::default();
        let body = build_body(ApiFamily::Gemini, "gemini-1.5-flash", "sys", "user", &params);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "sys");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn openai_body_has_expected_shape() {
        let params = GenerationParams::default();
        let body = build_body(ApiFamily::OpenAi, "gpt-4o-mini", "sys", "user", &params);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }
}

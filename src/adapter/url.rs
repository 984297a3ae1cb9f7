//! URL and header assembly for each provider family.

use crate::job::ApiFamily;
use crate::pool::Credential;

const GEMINI_DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models/";
const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Resolved request target: the URL to POST to, and an optional header to
/// attach for auth (used when the API key can't travel as a query param).
pub struct RequestTarget {
    pub url: String,
    pub auth_header: Option<(&'static str, String)>,
}

pub fn build_target(family: ApiFamily, credential: &Credential) -> RequestTarget {
    match family {
        ApiFamily::Gemini => build_gemini_target(credential),
        ApiFamily::OpenAi => build_openai_target(credential),
    }
}

fn build_gemini_target(credential: &Credential) -> RequestTarget {
    let model = credential.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL);

    let base = match &credential.base_url {
        Some(b) if b.contains(":generateContent") => b.clone(),
        Some(b) => join_base_and_model(b, model),
        None => join_base_and_model(GEMINI_DEFAULT_BASE, model),
    };

    if base.contains("key=") {
        return RequestTarget { url: base, auth_header: None };
    }

    if requires_header_auth(&base) {
        return RequestTarget {
            url: base,
            auth_header: Some(("x-goog-api-key", credential.key.clone())),
        };
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    RequestTarget {
        url: format!("{base}{separator}key={}", credential.key),
        auth_header: None,
    }
}

fn join_base_and_model(base: &str, model: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    format!("{trimmed}/{model}:generateContent")
}

/// Hosts known to front Gemini traffic through a reverse proxy that expects
/// header auth instead of a `key=` query parameter.
fn requires_header_auth(url: &str) -> bool {
    !url.contains("generativelanguage.googleapis.com")
}

fn build_openai_target(credential: &Credential) -> RequestTarget {
    let base = credential
        .base_url
        .as_deref()
        .unwrap_or(OPENAI_DEFAULT_URL)
        .trim_end_matches('/')
        .to_string();

    let url = if base.contains("chat/completions") {
        base
    } else {
        format!("{base}/chat/completions")
    };

    RequestTarget {
        url,
        auth_header: Some(("Authorization", format!("Bearer {}", credential.key))),
    }
}

pub fn openai_model(credential: &Credential) -> &str {
    credential.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL)
}

/// First-party endpoints get the shorter 120s timeout; anything else (self
/// hosted gateways, third-party proxies) gets 180s.
pub fn is_first_party_host(url: &str) -> bool {
    url.contains("generativelanguage.googleapis.com") || url.contains("openai.com")
}

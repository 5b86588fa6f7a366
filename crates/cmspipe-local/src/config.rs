//! Environment-driven configuration.
//!
//! Everything is read lazily at construction time (`*::from_env()`); nothing here caches.

use serde::Serialize;

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    env(key).and_then(|s| s.parse::<u64>().ok())
}

/// Comma-separated list; `None` when unset or when every item is blank.
pub(crate) fn env_list(key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = env(key)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

/// A secrets-free view of the effective configuration (for `cmspipe doctor`).
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub llm_base_url: Option<String>,
    pub llm_api_key_set: bool,
    pub llm_model: Option<String>,
    pub vision_model: Option<String>,
    pub llm_timeout_ms: Option<u64>,
    pub ai_configured: bool,
    pub bold_classes: Vec<String>,
    pub italic_classes: Vec<String>,
    pub seo_system_prompt_file: Option<String>,
    pub seo_prompt_file: Option<String>,
    pub vision_prompt_file: Option<String>,
    pub store_dir: String,
    pub public_base_url: Option<String>,
}

pub fn report() -> ConfigReport {
    let styles = crate::render::StyleMap::from_env();
    let llm_base_url = crate::openai_compat::openai_compat_base_url_from_env();
    let llm_model = crate::openai_compat::openai_compat_model_from_env();
    ConfigReport {
        ai_configured: llm_base_url.is_some() && llm_model.is_some(),
        llm_base_url,
        llm_api_key_set: crate::openai_compat::openai_compat_api_key_from_env().is_some(),
        vision_model: crate::openai_compat::vision_model_from_env().or_else(|| llm_model.clone()),
        llm_model,
        llm_timeout_ms: crate::openai_compat::llm_timeout_ms_from_env(),
        bold_classes: styles.bold,
        italic_classes: styles.italic,
        seo_system_prompt_file: env("CMSPIPE_SEO_SYSTEM_PROMPT_FILE"),
        seo_prompt_file: env("CMSPIPE_SEO_PROMPT_FILE"),
        vision_prompt_file: env("CMSPIPE_VISION_PROMPT_FILE"),
        store_dir: crate::store::store_dir_from_env().display().to_string(),
        public_base_url: env("CMSPIPE_PUBLIC_BASE_URL"),
    }
}

//! Best-effort AI enrichment: SEO fields from a text model, alt text from a vision model.
//!
//! Nothing in here returns an error. Every failure is logged and turns into `None`,
//! which makes the caller fall through to the rule-based generators.

use cmspipe_core::{Category, ChatBackend, ChatMessage, Error, Result};
use std::sync::Arc;

use crate::config::env;
use crate::fallback::cap_alt_text;

/// Characters of body text handed to the SEO prompt.
pub const CONTENT_PREVIEW_MAX_CHARS: usize = 500;

/// Prompt texts. These are data, not logic: the defaults target one Dutch publication and
/// can be replaced wholesale through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub seo_system: String,
    /// Supports `{title}`, `{first_paragraph}` and `{content_preview}`.
    pub seo_user_template: String,
    pub vision: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            seo_system: include_str!("../prompts/seo_system.txt").trim().to_string(),
            seo_user_template: include_str!("../prompts/seo_user.txt").trim().to_string(),
            vision: include_str!("../prompts/vision.txt").trim().to_string(),
        }
    }
}

fn read_prompt_file(key: &str) -> Result<Option<String>> {
    let Some(path) = env(key) else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::NotConfigured(format!("{key}={path}: {e}")))?;
    Ok(Some(text.trim().to_string()))
}

impl Prompts {
    pub fn from_env() -> Result<Self> {
        let mut out = Self::default();
        if let Some(p) = read_prompt_file("CMSPIPE_SEO_SYSTEM_PROMPT_FILE")? {
            out.seo_system = p;
        }
        if let Some(p) = read_prompt_file("CMSPIPE_SEO_PROMPT_FILE")? {
            out.seo_user_template = p;
        }
        if let Some(p) = read_prompt_file("CMSPIPE_VISION_PROMPT_FILE")? {
            out.vision = p;
        }
        Ok(out)
    }

    pub fn seo_user(&self, title: &str, first_paragraph: &str, content_preview: &str) -> String {
        fill_template(
            &self.seo_user_template,
            &[
                ("title", title),
                ("first_paragraph", first_paragraph),
                ("content_preview", content_preview),
            ],
        )
    }
}

// Single pass, so placeholder-looking text inside a value is never expanded again.
fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (close, *v))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fields parsed from the labeled SEO reply. Missing or empty labels stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoFields {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub preview: Option<String>,
    pub category: Option<Category>,
}

impl SeoFields {
    pub fn is_empty(&self) -> bool {
        self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.keywords.is_none()
            && self.preview.is_none()
            && self.category.is_none()
    }
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Parse `LABEL: value` lines. Labels must start the line; anything else is ignored.
pub fn parse_seo_response(text: &str) -> SeoFields {
    let mut out = SeoFields::default();
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("META_TITLE:") {
            out.meta_title = non_empty(v);
        } else if let Some(v) = line.strip_prefix("META_DESCRIPTION:") {
            out.meta_description = non_empty(v);
        } else if let Some(v) = line.strip_prefix("KEYWORDS:") {
            out.keywords = non_empty(v);
        } else if let Some(v) = line.strip_prefix("PREVIEW:") {
            out.preview = non_empty(v);
        } else if let Some(v) = line.strip_prefix("CATEGORY:") {
            out.category = match v.parse::<Category>() {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring AI category");
                    None
                }
            };
        }
    }
    out
}

#[derive(Clone)]
pub struct Enricher {
    text: Arc<dyn ChatBackend>,
    vision: Arc<dyn ChatBackend>,
    prompts: Prompts,
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("text", &self.text.name())
            .field("vision", &self.vision.name())
            .finish_non_exhaustive()
    }
}

impl Enricher {
    pub fn new(text: Arc<dyn ChatBackend>, vision: Arc<dyn ChatBackend>, prompts: Prompts) -> Self {
        Self {
            text,
            vision,
            prompts,
        }
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub async fn seo_fields(
        &self,
        title: &str,
        first_paragraph: &str,
        content_preview: &str,
    ) -> Option<SeoFields> {
        let preview: String = content_preview
            .chars()
            .take(CONTENT_PREVIEW_MAX_CHARS)
            .collect();
        let messages = [
            ChatMessage::system(self.prompts.seo_system.clone()),
            ChatMessage::user(self.prompts.seo_user(title, first_paragraph, &preview)),
        ];
        match self.text.complete(&messages).await {
            Ok(reply) => {
                let fields = parse_seo_response(reply.trim());
                if fields.is_empty() {
                    tracing::warn!(
                        backend = self.text.name(),
                        "SEO reply had no recognizable labels; using fallbacks"
                    );
                }
                Some(fields)
            }
            Err(e) => {
                tracing::warn!(backend = self.text.name(), error = %e, "SEO enrichment failed; using fallbacks");
                None
            }
        }
    }

    pub async fn image_alt(&self, image_url: &str) -> Option<String> {
        let messages = [ChatMessage::user_with_image(
            self.prompts.vision.clone(),
            image_url,
        )];
        match self.vision.complete(&messages).await {
            Ok(reply) => {
                let alt = reply.trim();
                if alt.is_empty() {
                    tracing::warn!(backend = self.vision.name(), "vision reply was empty; using fallback alt text");
                    return None;
                }
                Some(cap_alt_text(alt))
            }
            Err(e) => {
                tracing::warn!(backend = self.vision.name(), error = %e, "vision enrichment failed; using fallback alt text");
                None
            }
        }
    }
}

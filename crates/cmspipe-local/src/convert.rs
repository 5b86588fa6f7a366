//! Record assembly: segment, enrich, resolve every field, done.

use chrono::{DateTime, Utc};
use cmspipe_core::{ConversionMetadata, ConversionResult, Error, Result};
use std::sync::Arc;

use crate::enrich::{Enricher, Prompts, SeoFields};
use crate::fallback::{self, FallbackHeuristics, RuleBasedHeuristics};
use crate::openai_compat::OpenAiCompatClient;
use crate::render::StyleMap;
use crate::resolve::{resolve_field, Provenance};
use crate::segment::extract_article;

/// Words of body text offered to the SEO prompt (before the character cap).
pub const CONTENT_PREVIEW_WORDS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub html: String,
    pub image_url: String,
    /// Gates the SEO call only.
    pub use_ai: bool,
    /// Gates the alt-text call.
    pub use_vision: bool,
    pub metadata: ConversionMetadata,
    /// Used for `date` when the metadata has none. Defaults to now.
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl ConvertRequest {
    pub fn new(html: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            image_url: image_url.into(),
            use_ai: true,
            use_vision: true,
            metadata: ConversionMetadata::default(),
            uploaded_at: None,
        }
    }

    /// Raw export bytes; anything that is not UTF-8 is rejected as unparseable.
    pub fn from_bytes(html: &[u8], image_url: impl Into<String>) -> Result<Self> {
        let html = std::str::from_utf8(html)
            .map_err(|e| Error::Parse(format!("document is not valid UTF-8: {e}")))?;
        Ok(Self::new(html, image_url))
    }

    pub fn with_use_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = use_ai;
        self
    }

    pub fn with_use_vision(mut self, use_vision: bool) -> Self {
        self.use_vision = use_vision;
        self
    }

    pub fn with_metadata(mut self, metadata: ConversionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_uploaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.uploaded_at = Some(at);
        self
    }
}

fn content_preview(body_text: &str) -> String {
    body_text
        .split_whitespace()
        .take(CONTENT_PREVIEW_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct Converter {
    styles: StyleMap,
    heuristics: Arc<dyn FallbackHeuristics>,
    enricher: Option<Enricher>,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            styles: StyleMap::default(),
            heuristics: Arc::new(RuleBasedHeuristics),
            enricher: None,
        }
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("styles", &self.styles)
            .field("enricher", &self.enricher)
            .finish_non_exhaustive()
    }
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_heuristics(mut self, heuristics: Arc<dyn FallbackHeuristics>) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn has_enricher(&self) -> bool {
        self.enricher.is_some()
    }

    /// Style classes, prompts and the OpenAI-compatible backends from the environment.
    /// A missing backend is not an error: conversions then run on fallbacks only.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let prompts = Prompts::from_env()?;
        let mut out = Self::new().with_styles(StyleMap::from_env());
        match (
            OpenAiCompatClient::from_env(client.clone(), None),
            OpenAiCompatClient::vision_from_env(client),
        ) {
            (Ok(text), Ok(vision)) => {
                out.enricher = Some(Enricher::new(Arc::new(text), Arc::new(vision), prompts));
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(error = %e, "AI backend not configured");
            }
        }
        Ok(out)
    }

    pub async fn convert(&self, req: ConvertRequest) -> Result<ConversionResult> {
        Ok(self.convert_with_provenance(req).await?.0)
    }

    /// Like [`Converter::convert`], also reporting where each resolved field came from.
    pub async fn convert_with_provenance(
        &self,
        req: ConvertRequest,
    ) -> Result<(ConversionResult, Provenance)> {
        // Parsing is synchronous and its tree never lives across an await.
        let article = extract_article(&req.html, &self.styles)?;
        let meta = req.metadata.normalized();
        let image_url = req.image_url.trim().to_string();

        if req.use_ai && self.enricher.is_none() {
            tracing::warn!("AI requested but no backend is configured; using fallbacks");
        }
        let enricher = self.enricher.as_ref();
        let needs_seo = req.use_ai
            && (meta.meta_title.is_none()
                || meta.meta_description.is_none()
                || meta.keywords.is_none()
                || meta.preview.is_none()
                || meta.category.is_none());
        let needs_alt = req.use_vision && meta.image_alt.is_none() && !image_url.is_empty();

        let preview_text = content_preview(&article.body_text);
        let seo_call = async {
            match enricher {
                Some(e) if needs_seo => {
                    e.seo_fields(&article.title, &article.first_paragraph, &preview_text)
                        .await
                }
                _ => None,
            }
        };
        let alt_call = async {
            match enricher {
                Some(e) if needs_alt => e.image_alt(&image_url).await,
                _ => None,
            }
        };
        let (seo, ai_alt) = tokio::join!(seo_call, alt_call);
        let SeoFields {
            meta_title: ai_meta_title,
            meta_description: ai_meta_description,
            keywords: ai_keywords,
            preview: ai_preview,
            category: ai_category,
        } = seo.unwrap_or_default();

        let h = self.heuristics.as_ref();
        let title = article.title.as_str();
        let intro = article.first_paragraph.as_str();
        let body = article.body_text.as_str();
        let mut prov = Provenance::default();

        // Overrides are held to the same shape as generated slugs; the slug names the CSV file.
        let slug_override = meta
            .slug
            .map(|s| fallback::slugify(&s))
            .filter(|s| !s.is_empty());
        let slug = prov.record(resolve_field("slug", slug_override, None, || h.slug(title)));
        let meta_title = prov.record(resolve_field(
            "meta_title",
            meta.meta_title,
            ai_meta_title,
            || h.meta_title(title),
        ));
        let meta_description = prov.record(resolve_field(
            "meta_description",
            meta.meta_description,
            ai_meta_description,
            || h.meta_description(intro),
        ));
        let keywords = prov.record(resolve_field(
            "keywords",
            meta.keywords,
            ai_keywords,
            || h.keywords(title, body),
        ));
        let preview = prov.record(resolve_field("preview", meta.preview, ai_preview, || {
            h.preview(intro)
        }));
        let category = prov.record(resolve_field(
            "category",
            meta.category,
            ai_category,
            || h.category(title, body),
        ));
        let image_alt = prov.record(resolve_field(
            "image_alt",
            meta.image_alt.map(|a| fallback::cap_alt_text(&a)),
            ai_alt,
            || h.image_alt(title),
        ));
        let date = prov.record(resolve_field(
            "date",
            meta.date.map(|d| d.format("%Y-%m-%d").to_string()),
            None,
            || fallback::format_date(req.uploaded_at.unwrap_or_else(Utc::now)),
        ));

        let result = ConversionResult {
            reading_time: fallback::reading_time(body),
            title: article.title.clone(),
            slug,
            meta_title,
            meta_description,
            keywords,
            preview,
            category,
            date,
            image_url,
            image_alt,
            first_paragraph: article.first_paragraph.clone(),
            content: article.content_html,
            sources: article.sources_html,
        };
        tracing::info!(
            slug = %result.slug,
            category = %result.category,
            reading_time = %result.reading_time,
            ai = enricher.is_some() && (needs_seo || needs_alt),
            "converted article"
        );
        Ok((result, prov))
    }
}

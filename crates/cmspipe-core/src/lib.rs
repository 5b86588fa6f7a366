use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("csv failed: {0}")]
    Csv(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The three fixed CMS categories. Declaration order doubles as the tie-break order
/// for the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "Founders & Startups")]
    FoundersStartups,
    #[serde(rename = "Nederlandse AI in de wereld")]
    DutchAiInTheWorld,
    #[serde(rename = "Investeren in Nederlandse AI")]
    InvestingInDutchAi,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::FoundersStartups,
        Category::DutchAiInTheWorld,
        Category::InvestingInDutchAi,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::FoundersStartups => "Founders & Startups",
            Category::DutchAiInTheWorld => "Nederlandse AI in de wereld",
            Category::InvestingInDutchAi => "Investeren in Nederlandse AI",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Case-insensitive; tolerates the quoting/bracketing LLMs like to wrap labels in.
    fn from_str(s: &str) -> Result<Self> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '[' | ']' | '*' | '`'))
            .trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| Error::InvalidInput(format!("unknown category: {s:?}")))
    }
}

/// Pre-supplied field values. Anything present (and non-empty) wins over AI and fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionMetadata {
    pub slug: Option<String>,
    #[serde(alias = "metaTitle")]
    pub meta_title: Option<String>,
    #[serde(alias = "metaDescription")]
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub preview: Option<String>,
    pub category: Option<Category>,
    #[serde(alias = "imageAlt")]
    pub image_alt: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ConversionMetadata {
    /// Drop empty-string overrides so they count as "not supplied".
    pub fn normalized(mut self) -> Self {
        for f in [
            &mut self.slug,
            &mut self.meta_title,
            &mut self.meta_description,
            &mut self.keywords,
            &mut self.preview,
            &mut self.image_alt,
        ] {
            if f.as_deref().is_some_and(str::is_empty) {
                *f = None;
            }
        }
        self
    }
}

/// One fully resolved CMS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub title: String,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: String,
    pub preview: String,
    pub category: Category,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// e.g. `"4 min"`.
    pub reading_time: String,
    pub image_url: String,
    pub image_alt: String,
    pub first_paragraph: String,
    pub content: String,
    pub sources: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user turn carrying a text prompt plus an image reference.
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

/// A chat-completion style generator (text or vision).
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Stores a byte payload and returns a publicly retrievable address for it.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

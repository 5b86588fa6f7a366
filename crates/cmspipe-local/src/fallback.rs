//! Rule-based (non-AI) derivation of the SEO/metadata fields.
//!
//! All functions are pure. Lengths are counted in chars, not bytes.

use chrono::{DateTime, Utc};
use cmspipe_core::Category;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const META_TITLE_MAX_CHARS: usize = 60;
pub const META_DESCRIPTION_MAX_CHARS: usize = 155;
pub const META_DESCRIPTION_MIN_CHARS: usize = 100;
pub const IMAGE_ALT_MAX_CHARS: usize = 125;
pub const KEYWORD_COUNT: usize = 5;
pub const PREVIEW_SENTENCES: usize = 2;
pub const WORDS_PER_MINUTE: f64 = 225.0;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("SENTENCE_SPLIT should compile"));
static KEYWORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zà-ÿ]{3,}\b").expect("KEYWORD_TOKEN should compile"));
static WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("WORD_RUN should compile"));

const STOP_WORDS: &[&str] = &[
    "de", "het", "een", "en", "van", "in", "op", "is", "voor", "met", "aan", "als", "dat", "die",
    "dit", "te", "zijn", "er", "ook", "om", "naar", "bij", "door", "maar", "niet", "heeft", "kan",
    "wordt", "deze", "worden", "werd", "was", "uit", "over", "onder", "na", "nog", "zich", "meer",
    "geen", "wel", "waar", "dan", "zo",
];

const FOUNDERS_KEYWORDS: &[&str] = &[
    "founder",
    "oprichter",
    "startup",
    "bedrijf",
    "ceo",
    "ondernemer",
    "profiel",
];
const INTERNATIONAL_KEYWORDS: &[&str] = &[
    "internationaal",
    "wereld",
    "global",
    "europa",
    "amerika",
    "succes",
    "groei",
    "schaal",
];
const INVESTMENT_KEYWORDS: &[&str] = &[
    "investering",
    "kapitaal",
    "funding",
    "venture",
    "regels",
    "wet",
    "beleid",
    "klimaat",
    "financiering",
];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

// Everything before the last space; the tail after it is treated as a cut-off word.
fn drop_last_word(s: &str) -> &str {
    match s.rfind(' ') {
        Some(i) => &s[..i],
        None => "",
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    out
}

pub fn meta_title(title: &str) -> String {
    if char_len(title) <= META_TITLE_MAX_CHARS {
        return title.to_string();
    }
    drop_last_word(prefix_chars(title, META_TITLE_MAX_CHARS)).to_string()
}

pub fn meta_description(first_paragraph: &str) -> String {
    let clean = normalize_ws(first_paragraph);
    if char_len(&clean) <= META_DESCRIPTION_MAX_CHARS {
        return clean;
    }

    let mut description = String::new();
    for sentence in SENTENCE_SPLIT.split(&clean) {
        if char_len(&description) + char_len(sentence) + 1 <= META_DESCRIPTION_MAX_CHARS {
            description.push_str(sentence);
            description.push_str(". ");
        } else {
            break;
        }
    }
    let description = description.trim();
    if char_len(description) >= META_DESCRIPTION_MIN_CHARS {
        return description.to_string();
    }

    let truncated = drop_last_word(prefix_chars(&clean, META_DESCRIPTION_MAX_CHARS));
    if truncated.ends_with('.') {
        truncated.to_string()
    } else {
        format!("{truncated}.")
    }
}

/// Most frequent non-stop-words of title + body; ties keep first-occurrence order.
pub fn keywords(title: &str, body_text: &str) -> String {
    let text = format!("{title} {body_text}").to_lowercase();

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for m in KEYWORD_TOKEN.find_iter(&text) {
        let word = m.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        match index.get(word) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    // Stable sort: equal counts stay in first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .iter()
        .take(KEYWORD_COUNT)
        .map(|(w, _)| *w)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn preview(first_paragraph: &str) -> String {
    if first_paragraph.trim().is_empty() {
        // No intro, no preview: an empty field rather than a lone ".".
        return String::new();
    }
    let mut out = SENTENCE_SPLIT
        .split(first_paragraph)
        .take(PREVIEW_SENTENCES)
        .collect::<Vec<_>>()
        .join(". ");
    if !out.ends_with(|c: char| matches!(c, '.' | '!' | '?')) {
        out.push('.');
    }
    out
}

pub fn category(title: &str, body_text: &str) -> Category {
    let combined = format!("{title} {body_text}").to_lowercase();
    let score = |kws: &[&str]| kws.iter().filter(|kw| combined.contains(**kw)).count();

    let scored = [
        (Category::FoundersStartups, score(FOUNDERS_KEYWORDS)),
        (Category::DutchAiInTheWorld, score(INTERNATIONAL_KEYWORDS)),
        (Category::InvestingInDutchAi, score(INVESTMENT_KEYWORDS)),
    ];
    let mut best = (Category::FoundersStartups, 0usize);
    for (cat, s) in scored {
        if s > best.1 {
            best = (cat, s);
        }
    }
    best.0
}

pub fn image_alt(title: &str) -> String {
    let alt = format!("Illustratie bij artikel over {}", title.to_lowercase());
    if char_len(&alt) <= IMAGE_ALT_MAX_CHARS {
        return alt;
    }
    drop_last_word(prefix_chars(&alt, IMAGE_ALT_MAX_CHARS)).to_string()
}

/// Hard cap used for alt text that did not come from [`image_alt`] (vision output, overrides).
pub fn cap_alt_text(alt: &str) -> String {
    if char_len(alt) <= IMAGE_ALT_MAX_CHARS {
        return alt.to_string();
    }
    format!("{}...", prefix_chars(alt, IMAGE_ALT_MAX_CHARS - 3))
}

pub fn word_count(text: &str) -> usize {
    WORD_RUN.find_iter(text).count()
}

pub fn reading_time(text: &str) -> String {
    let minutes = (word_count(text) as f64 / WORDS_PER_MINUTE).round() as u64;
    format!("{} min", minutes.max(1))
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Swappable fallback strategy. Defaults are the Dutch rule-based heuristics above.
pub trait FallbackHeuristics: Send + Sync {
    fn slug(&self, title: &str) -> String {
        slugify(title)
    }
    fn meta_title(&self, title: &str) -> String {
        meta_title(title)
    }
    fn meta_description(&self, first_paragraph: &str) -> String {
        meta_description(first_paragraph)
    }
    fn keywords(&self, title: &str, body_text: &str) -> String {
        keywords(title, body_text)
    }
    fn preview(&self, first_paragraph: &str) -> String {
        preview(first_paragraph)
    }
    fn category(&self, title: &str, body_text: &str) -> Category {
        category(title, body_text)
    }
    fn image_alt(&self, title: &str) -> String {
        image_alt(title)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedHeuristics;

impl FallbackHeuristics for RuleBasedHeuristics {}

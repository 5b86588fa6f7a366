//! Re-serialization of word-processor elements into the CMS rich-text dialect.
//!
//! Output only ever uses `p`, `strong`, `em`, `a`, `h2`, `table`, `tr`, `td`, `th`.
//! Anything else in the input is either flattened to text or dropped.

use html_scraper::node::{Element, Node};
use html_scraper::{ElementRef, Selector};

use crate::config::env_list;

/// Which half of the article an element belongs to.
///
/// Content paragraphs turn italic spans and `<br>` into real paragraph breaks; the
/// sources block (short citation lines) keeps them inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Content,
    Sources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineStyle {
    Bold,
    Italic,
}

/// Class-token lookup table for inline styling.
///
/// Word-processor exports encode bold/italic as generated CSS classes rather than
/// `<b>`/`<i>`, and the class names differ per exporter (and sometimes per document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMap {
    pub bold: Vec<String>,
    pub italic: Vec<String>,
}

impl Default for StyleMap {
    fn default() -> Self {
        Self::google_docs()
    }
}

impl StyleMap {
    /// Google Docs "Download as HTML" classes.
    pub fn google_docs() -> Self {
        Self {
            bold: vec!["c9".to_string()],
            italic: vec!["c26".to_string()],
        }
    }

    /// `CMSPIPE_BOLD_CLASSES` / `CMSPIPE_ITALIC_CLASSES` (comma-separated) replace the
    /// corresponding default list when set.
    pub fn from_env() -> Self {
        let mut out = Self::google_docs();
        if let Some(bold) = env_list("CMSPIPE_BOLD_CLASSES") {
            out.bold = bold;
        }
        if let Some(italic) = env_list("CMSPIPE_ITALIC_CLASSES") {
            out.italic = italic;
        }
        out
    }

    // Bold wins when a span carries both tokens.
    fn style_of(&self, el: &Element) -> Option<InlineStyle> {
        let has_any = |tokens: &[String]| el.classes().any(|c| tokens.iter().any(|t| t == c));
        if has_any(&self.bold) {
            Some(InlineStyle::Bold)
        } else if has_any(&self.italic) {
            Some(InlineStyle::Italic)
        } else {
            None
        }
    }
}

/// Trimmed text content of an element (all descendant text nodes, concatenated).
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

fn trim_end_in_place(s: &mut String) {
    let keep = s.trim_end().len();
    s.truncate(keep);
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(ch);
    }
    out
}

/// Render one top-level element. Unrecognized tags render to `""`.
pub fn render_element(el: ElementRef<'_>, section: Section, styles: &StyleMap) -> String {
    match el.value().name() {
        "p" => render_paragraph(el, section, styles),
        "h2" | "h3" => format!("<h2>{}</h2>", escape_text(&text_of(el))),
        "table" => render_table(el),
        _ => String::new(),
    }
}

fn render_paragraph(el: ElementRef<'_>, section: Section, styles: &StyleMap) -> String {
    let mut html = String::from("<p>");

    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    html.push_str(&escape_text(t));
                    html.push(' ');
                }
            }
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let tag = child.value().name();
                match tag {
                    "span" => {
                        let text = escape_text(&text_of(child));
                        match (styles.style_of(child.value()), section) {
                            (Some(InlineStyle::Bold), _) => {
                                html.push_str(&format!("<strong>{text}</strong> "));
                            }
                            (Some(InlineStyle::Italic), Section::Content) => {
                                // Exporter quirk: manual line breaks come out as italic spans.
                                trim_end_in_place(&mut html);
                                html.push_str("</p><p><em>");
                                html.push_str(&text);
                                html.push_str("</em>");
                            }
                            (Some(InlineStyle::Italic), Section::Sources) => {
                                html.push_str(&format!("<em>{text}</em> "));
                            }
                            (None, _) => {
                                html.push_str(&text);
                                html.push(' ');
                            }
                        }
                    }
                    "a" => {
                        let href = escape_attr(child.value().attr("href").unwrap_or(""));
                        let text = escape_text(&text_of(child));
                        html.push_str(&format!("<a href=\"{href}\">{text}</a> "));
                    }
                    "br" if section == Section::Content => {
                        trim_end_in_place(&mut html);
                        html.push_str("</p><p>");
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    trim_end_in_place(&mut html);
    html.push_str("</p>");
    collapse_spaces(&html)
}

fn render_table(el: ElementRef<'_>) -> String {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
        return String::new();
    };

    let mut html = String::from("<table>");
    for row in el.select(&row_sel) {
        html.push_str("<tr>");
        for cell in row.select(&cell_sel) {
            let tag = cell.value().name();
            let text = escape_text(&text_of(cell));
            html.push_str(&format!("<{tag}>{text}</{tag}>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Render a run of elements and drop the empty paragraphs that breaks leave behind.
pub fn render_section(elements: &[ElementRef<'_>], section: Section, styles: &StyleMap) -> String {
    let joined: String = elements
        .iter()
        .map(|el| render_element(*el, section, styles))
        .collect();
    joined.replace("<p></p>", "").replace("<p> </p>", "")
}

//! Splitting an exported article into title / intro / content / sources.
//!
//! Layout contract of the export:
//! - the first `<h1>` is the title, the first `<h4>` is the intro paragraph
//! - body content follows, up to the first `<hr>`
//! - everything after that `<hr>` is the reference list

use cmspipe_core::{Error, Result};
use html_scraper::{ElementRef, Html, Selector};

use crate::render::{render_section, text_of, Section, StyleMap};

/// Heading always emitted at the top of the sources block.
pub const SOURCES_HEADING: &str = "<h2>Referenties</h2>";

/// Borrowed view of a segmented document.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    pub title: String,
    pub first_paragraph: String,
    pub content: Vec<ElementRef<'a>>,
    pub sources: Vec<ElementRef<'a>>,
    /// Full text content of `<body>`.
    pub body_text: String,
}

/// Owned, rendered result of segmentation. Holds no parser state, so it can cross `.await`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub first_paragraph: String,
    pub content_html: String,
    pub sources_html: String,
    pub body_text: String,
}

fn first_text(doc: &Html, selector: &str) -> String {
    let Ok(sel) = Selector::parse(selector) else {
        return String::new();
    };
    doc.select(&sel).next().map(text_of).unwrap_or_default()
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

// The output brings its own heading; an exported "Referenties"/"Bronnen" heading would double it.
fn is_sources_heading(el: ElementRef<'_>) -> bool {
    is_heading_tag(el.value().name())
        && matches!(
            text_of(el).to_lowercase().as_str(),
            "referenties" | "bronnen"
        )
}

pub fn segment(doc: &Html) -> Result<Segments<'_>> {
    let body_sel =
        Selector::parse("body").map_err(|e| Error::Parse(format!("body selector: {e:?}")))?;
    let body = doc
        .select(&body_sel)
        .next()
        .ok_or_else(|| Error::Parse("document has no <body>".to_string()))?;

    let title = first_text(doc, "h1");
    let first_paragraph = first_text(doc, "h4");

    let mut content = Vec::new();
    let mut sources = Vec::new();
    let mut in_sources = false;
    for el in body.children().filter_map(ElementRef::wrap) {
        let tag = el.value().name();
        if tag == "hr" {
            in_sources = true;
            continue;
        }
        if in_sources {
            sources.push(el);
        } else if tag != "h1" && tag != "h4" {
            content.push(el);
        }
    }

    Ok(Segments {
        title,
        first_paragraph,
        content,
        sources,
        body_text: body.text().collect(),
    })
}

/// Parse, segment and render in one synchronous step.
pub fn extract_article(html: &str, styles: &StyleMap) -> Result<ExtractedArticle> {
    let doc = Html::parse_document(html);
    let seg = segment(&doc)?;

    let content_html = render_section(&seg.content, Section::Content, styles);
    let sources: Vec<ElementRef<'_>> = seg
        .sources
        .iter()
        .copied()
        .filter(|el| !is_sources_heading(*el))
        .collect();
    let sources_html = format!(
        "{SOURCES_HEADING}{}",
        render_section(&sources, Section::Sources, styles)
    );

    tracing::debug!(
        content_elements = seg.content.len(),
        source_elements = sources.len(),
        title_found = !seg.title.is_empty(),
        intro_found = !seg.first_paragraph.is_empty(),
        "segmented article"
    );

    Ok(ExtractedArticle {
        title: seg.title,
        first_paragraph: seg.first_paragraph,
        content_html,
        sources_html,
        body_text: seg.body_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(els: &[ElementRef<'_>]) -> Vec<String> {
        els.iter().map(|e| e.value().name().to_string()).collect()
    }

    #[test]
    fn splits_on_first_hr_and_skips_title_and_intro() {
        let doc = Html::parse_document(
            "<body><h1> Titel </h1><h4>Intro</h4><p>a</p><h2>kop</h2><hr><p>bron</p><hr><p>bron2</p></body>",
        );
        let seg = segment(&doc).unwrap();
        assert_eq!(seg.title, "Titel");
        assert_eq!(seg.first_paragraph, "Intro");
        assert_eq!(tags(&seg.content), vec!["p", "h2"]);
        assert_eq!(tags(&seg.sources), vec!["p", "p"]);
    }

    #[test]
    fn headings_after_hr_are_kept_in_sources() {
        let doc = Html::parse_document("<body><p>a</p><hr><h1>Laat</h1><h4>x</h4></body>");
        let seg = segment(&doc).unwrap();
        assert_eq!(tags(&seg.sources), vec!["h1", "h4"]);
        // Title lookup is document-wide.
        assert_eq!(seg.title, "Laat");
    }

    #[test]
    fn no_hr_means_no_sources() {
        let doc = Html::parse_document("<body><p>a</p><table><tr><td>1</td></tr></table></body>");
        let seg = segment(&doc).unwrap();
        assert_eq!(tags(&seg.content), vec!["p", "table"]);
        assert!(seg.sources.is_empty());
        assert_eq!(seg.title, "");
        assert_eq!(seg.first_paragraph, "");
    }

    #[test]
    fn nested_title_is_found_but_wrapper_is_the_content_element() {
        let doc = Html::parse_document("<body><div><h1>Diep</h1></div><p>x</p></body>");
        let seg = segment(&doc).unwrap();
        assert_eq!(seg.title, "Diep");
        assert_eq!(tags(&seg.content), vec!["div", "p"]);
    }

    #[test]
    fn frameset_document_has_no_body() {
        let doc = Html::parse_document("<html><frameset><frame src=\"a.html\"></frameset></html>");
        assert!(matches!(segment(&doc), Err(Error::Parse(_))));
    }

    #[test]
    fn extract_drops_exported_references_heading_and_adds_own() {
        let art = extract_article(
            "<body><h1>T</h1><p>tekst</p><hr><h3>Bronnen</h3><p>Bron: <a href=\"https://x.com\">X</a></p></body>",
            &StyleMap::default(),
        )
        .unwrap();
        assert_eq!(art.content_html, "<p>tekst</p>");
        assert_eq!(
            art.sources_html,
            "<h2>Referenties</h2><p>Bron: <a href=\"https://x.com\">X</a></p>"
        );
    }

    #[test]
    fn extract_without_sources_keeps_bare_heading() {
        let art = extract_article("<p>x</p>", &StyleMap::default()).unwrap();
        assert_eq!(art.sources_html, SOURCES_HEADING);
        assert_eq!(art.content_html, "<p>x</p>");
    }

    #[test]
    fn empty_input_yields_empty_fields() {
        let art = extract_article("", &StyleMap::default()).unwrap();
        assert_eq!(art.title, "");
        assert_eq!(art.first_paragraph, "");
        assert_eq!(art.content_html, "");
        assert_eq!(art.body_text, "");
    }
}

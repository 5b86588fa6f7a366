//! The CMS import row: fixed header order, every field quoted, CRLF records.

use cmspipe_core::{ConversionResult, Error, Result};

use crate::fallback::slugify;

pub const CSV_HEADERS: [&str; 14] = [
    "Title",
    "Slug",
    "Meta Title",
    "Meta Description",
    "Keywords",
    "Preview",
    "Category",
    "Date",
    "Reading Time",
    "Image",
    "Image:alt",
    "First Paragraph",
    "Content",
    "Sources",
];

fn row(r: &ConversionResult) -> [&str; 14] {
    [
        r.title.as_str(),
        r.slug.as_str(),
        r.meta_title.as_str(),
        r.meta_description.as_str(),
        r.keywords.as_str(),
        r.preview.as_str(),
        r.category.label(),
        r.date.as_str(),
        r.reading_time.as_str(),
        r.image_url.as_str(),
        r.image_alt.as_str(),
        r.first_paragraph.as_str(),
        r.content.as_str(),
        r.sources.as_str(),
    ]
}

/// Header row plus one data row.
pub fn to_csv(result: &ConversionResult) -> Result<String> {
    let mut w = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    w.write_record(CSV_HEADERS)
        .map_err(|e| Error::Csv(e.to_string()))?;
    w.write_record(row(result))
        .map_err(|e| Error::Csv(e.to_string()))?;
    let bytes = w.into_inner().map_err(|e| Error::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Csv(e.to_string()))
}

/// `{slug}.csv`, or `artikel.csv` when the slug came out empty.
///
/// The slug is re-slugified, so the name never carries a path separator or `..`.
pub fn csv_file_name(result: &ConversionResult) -> String {
    let slug = slugify(&result.slug);
    if slug.is_empty() {
        "artikel.csv".to_string()
    } else {
        format!("{slug}.csv")
    }
}

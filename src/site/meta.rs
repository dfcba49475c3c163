//! Page-level fallbacks.
//!
//! When no embedded state maps to a valid record, two cheaper readings of the
//! page remain:
//!
//! - a media key matched in the raw markup ([`extract_raw_media`]), titled
//!   from whatever the document head offers
//! - the `<meta property="og:*">` tags ([`extract_fallback`]), which still
//!   tend to carry a title, a description and a thumbnail

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::record::{absolute_url, clean_text, ExtractionSource, VideoRecord};

static META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property][content]").expect("valid og meta selector")
});
static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"][content]"#).expect("valid description selector")
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

/// Build a record around a video URL found in the raw markup.
///
/// The title comes from `og:title`, then `<meta name="description">`, then
/// `<title>`. Returns `None` when none of them has text.
#[must_use]
pub fn extract_raw_media(page: &str, video_url: String) -> Option<VideoRecord> {
    let document = Html::parse_document(page);
    VideoRecord {
        title: page_title(&document),
        video_url: Some(video_url),
        ..VideoRecord::new(ExtractionSource::RawPattern)
    }
    .into_valid()
}

fn page_title(document: &Html) -> String {
    let og_title = document
        .select(&META)
        .filter(|e| {
            e.value()
                .attr("property")
                .is_some_and(|p| p.trim().eq_ignore_ascii_case("og:title"))
        })
        .filter_map(|e| e.value().attr("content"))
        .map(clean_text);
    let description = document
        .select(&META_DESCRIPTION)
        .filter_map(|e| e.value().attr("content"))
        .map(clean_text);
    let title = document
        .select(&TITLE)
        .map(|e| clean_text(&e.text().collect::<String>()));

    og_title
        .chain(description)
        .chain(title)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Build a record from `og:*` meta tags.
///
/// `og:video:url` (or `og:video`) is read only when `include_video` is set.
/// Returns `None` when neither `og:title` nor `og:description` has text.
#[must_use]
pub fn extract_fallback(page: &str, include_video: bool) -> Option<VideoRecord> {
    let document = Html::parse_document(page);

    let mut tags: Vec<(String, String)> = Vec::new();
    for element in document.select(&META) {
        let value = element.value();
        if let (Some(property), Some(content)) = (value.attr("property"), value.attr("content")) {
            tags.push((property.trim().to_ascii_lowercase(), content.to_string()));
        }
    }
    // First occurrence wins.
    let lookup = |name: &str| {
        tags.iter()
            .find(|(property, content)| property == name && !content.trim().is_empty())
            .map(|(_, content)| content.as_str())
    };

    let video_url = if include_video {
        lookup("og:video:url")
            .or_else(|| lookup("og:video:secure_url"))
            .or_else(|| lookup("og:video"))
            .and_then(absolute_url)
    } else {
        None
    };

    VideoRecord {
        title: lookup("og:title").map(clean_text).unwrap_or_default(),
        description: lookup("og:description").map(clean_text).unwrap_or_default(),
        cover: lookup("og:image").and_then(absolute_url),
        video_url,
        ..VideoRecord::new(ExtractionSource::MetaTags)
    }
    .into_valid()
}

//! Canonical output record.
//!
//! Every field serializes even when empty, so clients can rely on the key set.
//! A record counts as a successful parse only when [`VideoRecord::is_valid`].

use serde::Serialize;

use crate::platform::PlatformId;

/// Where a record's fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// JSON state blob inlined in the page.
    #[default]
    EmbeddedState,
    /// Platform REST API.
    Api,
    /// `og:*` meta tags.
    MetaTags,
    /// A media key matched directly in the page markup.
    RawPattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Author {
    pub name: String,
    pub id: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<String>,
}

/// Engagement counters. Unknown counters stay 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Statistics {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
    pub favorites: u64,
    pub coins: u64,
    pub danmaku: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u64>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Music {
    pub title: String,
    pub author: String,
    pub url: Option<String>,
}

/// One alternate encoding of the video (Douyin bit-rate ladder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoVariant {
    pub bit_rate: Option<u64>,
    pub quality: Option<String>,
    pub url: String,
}

/// One part of a multi-part upload (Bilibili `pages`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoPart {
    pub cid: Option<String>,
    /// 1-based part number.
    pub index: Option<u64>,
    pub title: String,
    /// Seconds.
    pub duration: Option<u64>,
}

/// Parsed video metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct VideoRecord {
    /// Attached by the pipeline once the record is accepted.
    pub platform: Option<PlatformId>,
    /// Final page URL.
    pub url: String,
    /// Platform-native id (note id, aweme id, bvid, photo id).
    pub source_id: Option<String>,
    pub source: ExtractionSource,
    /// Platform content kind where one is reported (Xiaohongshu `video` or `normal`).
    pub content_type: Option<String>,
    pub title: String,
    pub description: String,
    pub author: Author,
    pub cover: Option<String>,
    pub video_url: Option<String>,
    pub statistics: Statistics,
    pub tags: Vec<String>,
    /// Seconds.
    pub duration: Option<u64>,
    /// Unix seconds.
    pub publish_time: Option<i64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub images: Vec<Image>,
    pub music: Option<Music>,
    pub variants: Vec<VideoVariant>,
    pub parts: Vec<VideoPart>,
}

impl VideoRecord {
    #[must_use]
    pub fn new(source: ExtractionSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// A record is usable only if it carries a title or a description.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() || !self.description.trim().is_empty()
    }

    /// Return `Some(self)` if valid.
    #[must_use]
    pub fn into_valid(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }
}

/// Collapse whitespace runs to single spaces and trim.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make a media URL absolute. Protocol-relative URLs get `https:`; empty
/// strings become `None`.
#[must_use]
pub fn absolute_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        None
    } else if let Some(rest) = url.strip_prefix("//") {
        Some(format!("https://{rest}"))
    } else {
        Some(url.to_string())
    }
}

/// Round a millisecond duration to whole seconds. Saturates on absurd input.
#[must_use]
pub fn millis_to_seconds(ms: u64) -> u64 {
    ms.saturating_add(500) / 1000
}

/// Convert an epoch timestamp that may be in milliseconds to seconds.
#[must_use]
pub fn epoch_seconds(value: i64) -> i64 {
    // Anything past year 2286 in seconds is really milliseconds.
    if value > 9_999_999_999 {
        value / 1000
    } else {
        value
    }
}

//! Douyin videos.
//!
//! Share pages carry their state either as a percent-encoded JSON document in
//! `<script id="RENDER_DATA">` (camelCase keys) or as a plain
//! `window._ROUTER_DATA` assignment (snake_case keys). Both are served only
//! to mobile user agents.
//!
//! Media addresses come in several shapes depending on page version; see
//! [`MediaAddr`].

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{compile_markers, SiteParser};
use crate::fingerprint::BrowserProfile;
use crate::http_client::PageClient;
use crate::platform::PlatformId;
use crate::record::{
    absolute_url, epoch_seconds, millis_to_seconds, Author, ExtractionSource, Music, Statistics, VideoRecord,
    VideoVariant,
};
use crate::state::path::{
    first, first_count, first_string, first_text, get, int, items, number, text,
};
use crate::state::{capture_raw_string, DecodedState, Encoding, Marker, Scope};

static RAW_PLAY_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""playAddr"\s*:\s*\[\s*\{[^}]*"src"\s*:\s*"([^"]+)""#)
        .expect("valid play address regex")
});

/// A media address in one of its observed encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAddr {
    /// `[{"src": "..."}, ...]`
    Sources(Vec<String>),
    /// `["...", ...]`
    Urls(Vec<String>),
    /// `{"urlList": [...]}` or `{"url_list": [...]}`
    UrlList(Vec<String>),
    /// A bare URL string.
    Single(String),
}

impl MediaAddr {
    /// Recognize a media address. Returns `None` for unknown shapes and for
    /// shapes that carry no URL.
    #[must_use]
    pub fn decode(value: &Value) -> Option<Self> {
        let addr = match value {
            Value::String(s) => MediaAddr::Single(s.clone()),
            Value::Array(entries) if entries.iter().any(Value::is_object) => {
                MediaAddr::Sources(entries.iter().filter_map(|e| string_at(e, "src")).collect())
            }
            Value::Array(entries) => MediaAddr::Urls(strings(entries)),
            Value::Object(_) => {
                let list = first(value, &["urlList", "url_list"])?.as_array()?;
                MediaAddr::UrlList(strings(list))
            }
            _ => return None,
        };
        (!addr.urls().is_empty()).then_some(addr)
    }

    /// Candidate URLs, in upstream order.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        match self {
            MediaAddr::Sources(urls) | MediaAddr::Urls(urls) | MediaAddr::UrlList(urls) => urls,
            MediaAddr::Single(url) => std::slice::from_ref(url),
        }
    }

    /// First URL, made absolute.
    #[must_use]
    pub fn first_url(&self) -> Option<String> {
        self.urls().iter().find_map(|u| absolute_url(u))
    }
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_string)
}

fn strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// First absolute URL of the media address found under any of `paths`.
fn media_url(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| get(value, p))
        .find_map(|v| MediaAddr::decode(v).and_then(|addr| addr.first_url()))
}

pub struct DouyinParser {
    markers: Vec<Marker>,
}

impl DouyinParser {
    #[must_use]
    pub fn new() -> Self {
        let markers = compile_markers([
            Marker::new(
                "render_data",
                "RENDER_DATA",
                r#"(?s)<script id="RENDER_DATA" type="application/json">([^<]+)</script>"#,
                Encoding::Percent,
                Scope::Document,
            ),
            Marker::assignment("router_data", "window._ROUTER_DATA", Scope::Document),
        ]);
        Self { markers }
    }
}

impl Default for DouyinParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the aweme detail object in either state layout.
fn find_detail(root: &Value) -> Option<&Value> {
    if let Some(detail) = first(root, &["app.videoDetail", "app.aweme.detail"]) {
        return Some(detail);
    }

    if let Some(loader) = get(root, "loaderData").and_then(Value::as_object) {
        if let Some(item) = loader
            .values()
            .find_map(|page| get(page, "videoInfoRes.item_list.0"))
        {
            return Some(item);
        }
    }

    root.as_object()?.values().find_map(|value| {
        get(value, "aweme.detail")
            .or_else(|| get(value, "awemeDetail"))
            .or_else(|| get(value, "videoDetail"))
            .filter(|detail| detail.is_object())
    })
}

fn map_variant(entry: &Value) -> Option<VideoVariant> {
    Some(VideoVariant {
        url: media_url(entry, &["playAddr", "play_addr"])?,
        bit_rate: first_count_opt(entry, &["bitRate", "bit_rate"]),
        quality: first_string(entry, &["gearName", "gear_name"]),
    })
}

fn first_count_opt(value: &Value, paths: &[&str]) -> Option<u64> {
    paths.iter().find_map(|p| number(value, p))
}

fn map_music(detail: &Value) -> Option<Music> {
    let music = get(detail, "music")?;
    let title = text(music, "title");
    let author = first_text(music, &["authorName", "author"]);
    let url = media_url(music, &["playUrl", "play_url"]);
    if title.is_empty() && author.is_empty() && url.is_none() {
        return None;
    }
    Some(Music { title, author, url })
}

#[async_trait]
impl SiteParser for DouyinParser {
    fn platform(&self) -> PlatformId {
        PlatformId::Douyin
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn page_profile(&self, client: &PageClient) -> Option<BrowserProfile> {
        Some(client.mobile_profile())
    }

    fn raw_video_url(&self, page: &str) -> Option<String> {
        capture_raw_string(page, &RAW_PLAY_ADDR).and_then(|u| absolute_url(&u))
    }

    fn map_state(&self, state: &DecodedState) -> Option<VideoRecord> {
        let detail = find_detail(&state.root)?;
        let desc = text(detail, "desc");

        let tags = items(detail, "textExtra")
            .iter()
            .chain(items(detail, "text_extra"))
            .map(|tag| first_text(tag, &["hashtagName", "hashtag_name"]))
            .filter(|name| !name.is_empty())
            .collect();

        let variants: Vec<VideoVariant> = items(detail, "video.bitRateList")
            .iter()
            .chain(items(detail, "video.bit_rate"))
            .filter_map(map_variant)
            .collect();
        let video_url = media_url(detail, &["video.playAddr", "video.play_addr"])
            .or_else(|| variants.first().map(|v| v.url.clone()));

        VideoRecord {
            source_id: first_string(detail, &["awemeId", "aweme_id"]),
            title: desc.clone(),
            description: desc,
            author: Author {
                name: text(detail, "author.nickname"),
                id: first_string(detail, &["author.uid", "author.secUid", "author.sec_uid"]),
                avatar: media_url(detail, &["author.avatarThumb", "author.avatar_thumb"]),
                gender: None,
            },
            cover: media_url(
                detail,
                &["video.cover", "video.originCover", "video.origin_cover"],
            ),
            video_url,
            statistics: Statistics {
                likes: first_count(
                    detail,
                    &["stats.diggCount", "statistics.diggCount", "statistics.digg_count"],
                ),
                comments: first_count(
                    detail,
                    &["stats.commentCount", "statistics.commentCount", "statistics.comment_count"],
                ),
                shares: first_count(
                    detail,
                    &["stats.shareCount", "statistics.shareCount", "statistics.share_count"],
                ),
                favorites: first_count(
                    detail,
                    &["stats.collectCount", "statistics.collectCount", "statistics.collect_count"],
                ),
                views: first_count(detail, &["stats.playCount", "statistics.play_count"]),
                ..Statistics::default()
            },
            tags,
            // Milliseconds upstream.
            duration: number(detail, "video.duration")
                .filter(|ms| *ms > 0)
                .map(millis_to_seconds),
            publish_time: int(detail, "createTime")
                .or_else(|| int(detail, "create_time"))
                .map(epoch_seconds),
            width: number(detail, "video.width"),
            height: number(detail, "video.height"),
            music: map_music(detail),
            variants,
            ..VideoRecord::new(ExtractionSource::EmbeddedState)
        }
        .into_valid()
    }
}

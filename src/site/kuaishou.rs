//! Kuaishou videos.
//!
//! Three page generations are in circulation:
//!
//! - `window.pageData = {...}` with the photo under `.video`
//! - `window.SSR_DATA = {...}` with the stream under `.videoResource`
//! - `window.__APOLLO_STATE__ = {...}`, a normalized cache in which the
//!   photo is the first entry carrying a `caption`

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use super::{compile_markers, SiteParser};
use crate::platform::PlatformId;
use crate::record::{absolute_url, epoch_seconds, millis_to_seconds, Author, ExtractionSource, Statistics, VideoRecord};
use crate::state::path::{
    first_count, first_string, first_text, get, int, number, string, text,
};
use crate::state::{capture_raw_string, DecodedState, Marker, Scope};

static RAW_SRC_NO_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""srcNoMark"\s*:\s*"([^"]+)""#).expect("valid srcNoMark regex")
});

pub struct KuaishouParser {
    markers: Vec<Marker>,
}

impl KuaishouParser {
    #[must_use]
    pub fn new() -> Self {
        let markers = compile_markers([
            Marker::assignment("page_data", "window.pageData", Scope::Document),
            Marker::assignment("ssr_data", "window.SSR_DATA", Scope::Document),
            Marker::assignment("apollo_state", "window.__APOLLO_STATE__", Scope::Script),
        ]);
        Self { markers }
    }
}

impl Default for KuaishouParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteParser for KuaishouParser {
    fn platform(&self) -> PlatformId {
        PlatformId::Kuaishou
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn reads_og_video(&self) -> bool {
        true
    }

    fn raw_video_url(&self, page: &str) -> Option<String> {
        capture_raw_string(page, &RAW_SRC_NO_MARK).and_then(|u| absolute_url(&u))
    }

    fn map_state(&self, state: &DecodedState) -> Option<VideoRecord> {
        let root = &state.root;
        let record = if let Some(video) = get(root, "video").filter(|v| v.is_object()) {
            map_photo(video)
        } else if get(root, "videoResource").is_some() {
            map_ssr(root)
        } else {
            map_photo(find_captioned(root.as_object()?)?)
        };
        record.into_valid()
    }
}

/// Map a photo object (`pageData.video` or an Apollo cache entry).
fn map_photo(video: &Value) -> VideoRecord {
    let caption = text(video, "caption");
    let video_url = string(video, "mainMvUrls.0.url")
        .or_else(|| first_string(video, &["photoUrl", "playUrl"]))
        .and_then(|u| absolute_url(&u));

    VideoRecord {
        source_id: first_string(video, &["photoId", "id"]),
        title: caption.clone(),
        description: caption,
        author: Author {
            name: first_text(video, &["userName", "author.name"]),
            id: first_string(video, &["userId", "author.id"]),
            avatar: first_string(video, &["headUrl", "author.headerUrl"]).and_then(|u| absolute_url(&u)),
            gender: first_string(video, &["userSex"]),
        },
        cover: first_string(video, &["coverUrl", "poster"]).and_then(|u| absolute_url(&u)),
        video_url,
        statistics: Statistics {
            likes: first_count(video, &["likeCount", "realLikeCount"]),
            comments: first_count(video, &["commentCount"]),
            shares: first_count(video, &["shareCount", "forwardCount"]),
            views: first_count(video, &["viewCount"]),
            ..Statistics::default()
        },
        // Milliseconds upstream.
        duration: number(video, "duration")
            .filter(|ms| *ms > 0)
            .map(millis_to_seconds),
        publish_time: int(video, "timestamp").map(epoch_seconds),
        width: number(video, "width"),
        height: number(video, "height"),
        ..VideoRecord::new(ExtractionSource::EmbeddedState)
    }
}

fn map_ssr(root: &Value) -> VideoRecord {
    let caption = first_text(root, &["caption", "videoResource.caption"]);
    VideoRecord {
        source_id: first_string(root, &["photoId", "videoResource.photoId"]),
        title: caption.clone(),
        description: caption,
        author: Author {
            name: first_text(root, &["userName", "author.name"]),
            ..Author::default()
        },
        cover: first_string(root, &["coverUrl", "videoResource.coverUrl"])
            .and_then(|u| absolute_url(&u)),
        video_url: string(root, "videoResource.url").and_then(|u| absolute_url(&u)),
        ..VideoRecord::new(ExtractionSource::EmbeddedState)
    }
}

/// First cache entry with a `caption`, searching one level of nesting
/// (`{"defaultClient": {"VisionVideoDetailPhoto:…": {...}}}`).
fn find_captioned(cache: &Map<String, Value>) -> Option<&Value> {
    let has_caption = |v: &&Value| v.get("caption").is_some();
    cache.values().find(has_caption).or_else(|| {
        cache
            .values()
            .filter_map(Value::as_object)
            .find_map(|inner| inner.values().find(has_caption))
    })
}

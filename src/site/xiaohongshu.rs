//! Xiaohongshu (RED) notes.
//!
//! Note pages assign `window.__INITIAL_STATE__` with the note stored under
//! `note.noteDetailMap[<note id>].note`. Video notes reference their stream
//! by a CDN key rather than a URL, so the key is expanded through the
//! configured stream template.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{compile_markers, SiteParser};
use crate::platform::PlatformId;
use crate::record::{
    absolute_url, epoch_seconds, Author, ExtractionSource, Image, Statistics, VideoRecord,
};
use crate::state::path::{count, first_count, first_string, get, int, items, number, string, text};
use crate::state::{capture_raw_string, DecodedState, Marker, Scope};

const KEY_PLACEHOLDER: &str = "{key}";

static RAW_VIDEO_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""originVideoKey"\s*:\s*"([^"]+)""#).expect("valid video key regex")
});

pub struct XiaohongshuParser {
    markers: Vec<Marker>,
    video_cdn: String,
}

impl XiaohongshuParser {
    /// `video_cdn` is a URL template containing `{key}`.
    #[must_use]
    pub fn new(video_cdn: &str) -> Self {
        let markers = compile_markers([
            Marker::assignment("initial_state", "window.__INITIAL_STATE__", Scope::Document),
            // Some templates split the assignment out of the closing tag.
            Marker::assignment("initial_state_script", "window.__INITIAL_STATE__", Scope::Script),
        ]);
        Self {
            markers,
            video_cdn: video_cdn.to_string(),
        }
    }

    fn video_url(&self, note: &Value) -> Option<String> {
        let key = first_string(
            note,
            &["video.consumer.originVideoKey", "video.consumer.videoKey"],
        );
        key.and_then(|key| self.expand_key(&key)).or_else(|| {
            string(note, "video.media.stream.h264.0.masterUrl").and_then(|u| absolute_url(&u))
        })
    }

    /// Turn a CDN key into a stream URL. Keys that are already URLs pass through.
    fn expand_key(&self, key: &str) -> Option<String> {
        if key.starts_with("http") {
            Some(key.to_string())
        } else if self.video_cdn.contains(KEY_PLACEHOLDER) {
            Some(self.video_cdn.replace(KEY_PLACEHOLDER, key))
        } else {
            None
        }
    }
}

#[async_trait]
impl SiteParser for XiaohongshuParser {
    fn platform(&self) -> PlatformId {
        PlatformId::Xiaohongshu
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn raw_video_url(&self, page: &str) -> Option<String> {
        capture_raw_string(page, &RAW_VIDEO_KEY).and_then(|key| self.expand_key(&key))
    }

    fn map_state(&self, state: &DecodedState) -> Option<VideoRecord> {
        let note = get(&state.root, "note.noteDetailMap.*.note")?;

        let images: Vec<Image> = items(note, "imageList")
            .iter()
            .filter_map(|img| {
                let url = first_string(img, &["urlDefault", "url"]).and_then(|u| absolute_url(&u))?;
                Some(Image {
                    url,
                    width: number(img, "width"),
                    height: number(img, "height"),
                })
            })
            .collect();

        let cover = string(note, "video.cover.url")
            .and_then(|u| absolute_url(&u))
            .or_else(|| images.first().map(|img| img.url.clone()));

        let tags = items(note, "tagList")
            .iter()
            .map(|tag| text(tag, "name"))
            .filter(|name| !name.is_empty())
            .collect();

        VideoRecord {
            source_id: first_string(note, &["noteId", "id"]),
            content_type: string(note, "type"),
            title: text(note, "title"),
            description: text(note, "desc"),
            author: Author {
                name: text(note, "user.nickname"),
                id: string(note, "user.userId"),
                avatar: string(note, "user.avatar").and_then(|u| absolute_url(&u)),
                gender: None,
            },
            cover,
            video_url: self.video_url(note),
            statistics: Statistics {
                likes: count(note, "interactInfo.likedCount"),
                comments: count(note, "interactInfo.commentCount"),
                shares: count(note, "interactInfo.shareCount"),
                favorites: count(note, "interactInfo.collectedCount"),
                ..Statistics::default()
            },
            tags,
            duration: Some(first_count(note, &["video.capa.duration", "video.duration"]))
                .filter(|d| *d > 0),
            publish_time: int(note, "time").map(epoch_seconds),
            width: number(note, "video.width"),
            height: number(note, "video.height"),
            images,
            ..VideoRecord::new(ExtractionSource::EmbeddedState)
        }
        .into_valid()
    }
}

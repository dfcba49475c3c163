//! Bilibili videos.
//!
//! The web API is the primary source: `/x/web-interface/view` keyed by the
//! BV or av id in the page URL. When the API is unreachable or rejects the
//! id, the page's own `window.__INITIAL_STATE__.videoData` carries the same
//! fields.
//!
//! Two secondary lookups fill in what neither source includes:
//!
//! - tags from `/x/tag/archive/tags`
//! - a playable URL from `/x/player/playurl` (needs the first page's `cid`)
//!
//! Both are best effort. Their failures are logged and dropped; the record
//! is returned without the field.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{compile_markers, SiteParser};
use crate::error::FetchError;
use crate::http_client::{PageClient, RawPage};
use crate::platform::PlatformId;
use crate::record::{
    absolute_url, epoch_seconds, Author, ExtractionSource, Statistics, VideoPart, VideoRecord,
};
use crate::state::path::{count, first_string, get, int, items, number, string, text};
use crate::state::{extract_state, DecodedState, Marker, Scope};

static BVID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBV[0-9A-Za-z]{10}").expect("valid BV id regex"));
static AVID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bav(\d+)").expect("valid av id regex"));

/// A Bilibili video identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoId {
    /// `BV1xx411c7XZ`, prefix normalized to upper case.
    Bvid(String),
    /// Legacy numeric id (`av170001`).
    Aid(u64),
}

impl VideoId {
    /// Extract an id from a URL. BV ids take precedence over av ids.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if let Some(m) = BVID.find(url) {
            return Some(VideoId::Bvid(format!("BV{}", &m.as_str()[2..])));
        }
        AVID.captures(url)
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse().ok())
            .map(VideoId::Aid)
    }

    /// Identifier carried by an API or state `videoData` object.
    fn from_video(video: &Value) -> Option<Self> {
        string(video, "bvid")
            .map(VideoId::Bvid)
            .or_else(|| number(video, "aid").map(VideoId::Aid))
    }

    /// Query string selecting this video.
    #[must_use]
    pub fn query(&self) -> String {
        match self {
            VideoId::Bvid(bvid) => format!("bvid={}", urlencoding::encode(bvid)),
            VideoId::Aid(aid) => format!("aid={aid}"),
        }
    }

    fn bvid(&self) -> Option<&str> {
        match self {
            VideoId::Bvid(bvid) => Some(bvid),
            VideoId::Aid(_) => None,
        }
    }
}

pub struct BilibiliParser {
    markers: Vec<Marker>,
    api_base: String,
}

impl BilibiliParser {
    /// `api_base` is the API origin, e.g. `https://api.bilibili.com`.
    #[must_use]
    pub fn new(api_base: &str) -> Self {
        let markers = compile_markers([Marker::assignment(
            "initial_state",
            "window.__INITIAL_STATE__",
            Scope::Document,
        )]);
        Self {
            markers,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Video metadata from the view API. `Ok(None)` means the API answered
    /// but does not know the video (`code != 0`).
    pub async fn fetch_view(
        &self,
        id: &VideoId,
        client: &PageClient,
    ) -> Result<Option<Value>, FetchError> {
        let url = format!("{}/x/web-interface/view?{}", self.api_base, id.query());
        let body = client.fetch_json(&url, &client.page_options()).await?;

        if int(&body, "code") != Some(0) {
            debug!(
                code = ?int(&body, "code"),
                message = %text(&body, "message"),
                "View API rejected video id"
            );
            return Ok(None);
        }
        Ok(get(&body, "data").filter(|d| d.is_object()).cloned())
    }

    /// Tag names for a video. Secondary lookup.
    pub async fn fetch_tags(
        &self,
        id: &VideoId,
        client: &PageClient,
    ) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/x/tag/archive/tags?{}", self.api_base, id.query());
        let body = client.fetch_json(&url, &client.secondary_options()).await?;

        if int(&body, "code") != Some(0) {
            return Ok(Vec::new());
        }
        Ok(tag_names(&body, "data"))
    }

    /// Playable stream URL for a video page. Secondary lookup.
    pub async fn fetch_play_url(
        &self,
        bvid: &str,
        cid: &str,
        client: &PageClient,
    ) -> Result<Option<String>, FetchError> {
        let url = format!(
            "{}/x/player/playurl?bvid={}&cid={}&qn=80&fnval=0",
            self.api_base,
            urlencoding::encode(bvid),
            urlencoding::encode(cid)
        );
        let options = client
            .secondary_options()
            .with_referer(&format!("https://www.bilibili.com/video/{bvid}/"));
        let body = client.fetch_json(&url, &options).await?;

        if int(&body, "code") != Some(0) {
            return Ok(None);
        }
        Ok(string(&body, "data.durl.0.url").and_then(|u| absolute_url(&u)))
    }

    /// Fill tags and `video_url` through the secondary lookups.
    ///
    /// Errors end here: a failed lookup leaves its field empty.
    async fn enrich(
        &self,
        record: &mut VideoRecord,
        video: &Value,
        fallback_id: Option<&VideoId>,
        client: &PageClient,
    ) {
        let id = VideoId::from_video(video).or_else(|| fallback_id.cloned());
        let cid = first_string(video, &["pages.0.cid", "cid"]);
        let want_tags = record.tags.is_empty();
        let want_play_url = record.video_url.is_none();

        let tags = async {
            match &id {
                Some(id) if want_tags => Some(self.fetch_tags(id, client).await),
                _ => None,
            }
        };
        let play_url = async {
            match (id.as_ref().and_then(VideoId::bvid), cid.as_deref()) {
                (Some(bvid), Some(cid)) if want_play_url => {
                    Some(self.fetch_play_url(bvid, cid, client).await)
                }
                _ => None,
            }
        };
        let (tags, play_url) = tokio::join!(tags, play_url);

        match tags {
            Some(Ok(tags)) => record.tags = tags,
            Some(Err(e)) => debug!(error = %e, "Tag lookup failed, leaving tags empty"),
            None => {}
        }
        match play_url {
            Some(Ok(url)) => record.video_url = url,
            Some(Err(e)) => debug!(error = %e, "Play URL lookup failed, leaving video_url unset"),
            None => {}
        }
    }
}

#[async_trait]
impl SiteParser for BilibiliParser {
    fn platform(&self) -> PlatformId {
        PlatformId::Bilibili
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn map_state(&self, state: &DecodedState) -> Option<VideoRecord> {
        let video = get(&state.root, "videoData")?;
        let mut record = map_video(video, ExtractionSource::EmbeddedState);
        record.tags = tag_names(&state.root, "tags");
        record.into_valid()
    }

    async fn extract(&self, page: &RawPage, client: &PageClient) -> Option<VideoRecord> {
        let url_id = VideoId::from_url(&page.url);

        if let Some(id) = &url_id {
            match self.fetch_view(id, client).await {
                Ok(Some(video)) => {
                    let mut record = map_video(&video, ExtractionSource::Api);
                    if record.is_valid() {
                        self.enrich(&mut record, &video, url_id.as_ref(), client).await;
                        return Some(record);
                    }
                }
                Ok(None) => debug!(id = ?id, "Video unknown to the API"),
                Err(e) => warn!(error = %e, "View API unavailable, trying embedded state"),
            }
        }

        let state = extract_state(&page.body, &self.markers)?;
        let mut record = self.map_state(&state)?;
        if let Some(video) = get(&state.root, "videoData") {
            self.enrich(&mut record, video, url_id.as_ref(), client).await;
        }
        Some(record)
    }
}

/// Map a `videoData` object (API `data` and page state share the layout).
fn map_video(video: &Value, source: ExtractionSource) -> VideoRecord {
    VideoRecord {
        source_id: first_string(video, &["bvid", "aid"]),
        title: text(video, "title"),
        description: text(video, "desc"),
        author: Author {
            name: text(video, "owner.name"),
            id: string(video, "owner.mid"),
            avatar: string(video, "owner.face").and_then(|u| absolute_url(&u)),
            gender: None,
        },
        cover: string(video, "pic").and_then(|u| absolute_url(&u)),
        statistics: Statistics {
            likes: count(video, "stat.like"),
            comments: count(video, "stat.reply"),
            shares: count(video, "stat.share"),
            views: count(video, "stat.view"),
            favorites: count(video, "stat.favorite"),
            coins: count(video, "stat.coin"),
            danmaku: count(video, "stat.danmaku"),
        },
        duration: number(video, "duration").filter(|d| *d > 0),
        publish_time: int(video, "pubdate").map(epoch_seconds),
        width: number(video, "dimension.width"),
        height: number(video, "dimension.height"),
        parts: items(video, "pages")
            .iter()
            .map(|page| VideoPart {
                cid: string(page, "cid"),
                index: number(page, "page"),
                title: text(page, "part"),
                duration: number(page, "duration"),
            })
            .collect(),
        ..VideoRecord::new(source)
    }
}

fn tag_names(value: &Value, path: &str) -> Vec<String> {
    items(value, path)
        .iter()
        .map(|tag| text(tag, "tag_name"))
        .filter(|name| !name.is_empty())
        .collect()
}

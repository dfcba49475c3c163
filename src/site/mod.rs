//! Platform-specific extraction.
//!
//! Each supported platform has a [`SiteParser`] that knows its embedded-state
//! markers and how to map the decoded tree onto a [`VideoRecord`]. Parsers
//! never fetch the primary page themselves; the pipeline hands them a
//! [`RawPage`] and a shared [`PageClient`] for secondary lookups.
//!
//! # Architecture
//!
//! - [`SiteParser`]: async trait, one implementation per platform
//! - [`ParserRegistry`]: immutable platform → parser map, built once
//! - [`meta`]: `og:*` fallback shared by every platform
//!
//! # Example
//!
//! ```rust,no_run
//! use vidpeek::site::ParserRegistry;
//! use vidpeek::{Config, PageClient, PlatformId};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let client = PageClient::from_config(&config)?;
//! let registry = ParserRegistry::new(&config);
//!
//! let parser = registry.get(PlatformId::Bilibili);
//! let page = client
//!     .fetch_page("https://www.bilibili.com/video/BV1xx411c7XZ", &client.page_options())
//!     .await?;
//! if let Some(record) = parser.extract(&page, &client).await {
//!     println!("{}", record.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bilibili;
pub mod douyin;
pub mod kuaishou;
pub mod meta;
pub mod xiaohongshu;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::Config;
use crate::fingerprint::BrowserProfile;
use crate::http_client::{PageClient, RawPage};
use crate::platform::PlatformId;
use crate::record::VideoRecord;
use crate::state::{extract_state, DecodedState, Marker};

/// Extraction logic for one platform.
#[async_trait]
pub trait SiteParser: Send + Sync {
    /// Platform this parser handles.
    fn platform(&self) -> PlatformId;

    /// Embedded-state markers, tried in order.
    fn markers(&self) -> &[Marker];

    /// Map a decoded state tree onto a record. Pure; returns `None` unless
    /// the record is valid.
    fn map_state(&self, state: &DecodedState) -> Option<VideoRecord>;

    /// Browser profile for the page fetch, when the client default won't do.
    fn page_profile(&self, _client: &PageClient) -> Option<BrowserProfile> {
        None
    }

    /// Playable URL matched straight out of the page markup, for pages whose
    /// state blob could not be used.
    fn raw_video_url(&self, _page: &str) -> Option<String> {
        None
    }

    /// Whether the meta-tag fallback should also read `og:video`.
    fn reads_og_video(&self) -> bool {
        false
    }

    /// Primary extraction from a fetched page.
    ///
    /// Parsers with secondary lookups override this; failures of those
    /// lookups degrade the record and never surface here.
    async fn extract(&self, page: &RawPage, _client: &PageClient) -> Option<VideoRecord> {
        let state = extract_state(&page.body, self.markers())?;
        self.map_state(&state)
    }
}

/// Immutable map from platform to parser.
pub struct ParserRegistry {
    parsers: HashMap<PlatformId, Box<dyn SiteParser>>,
}

impl ParserRegistry {
    /// Build a parser for every platform.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let parsers: Vec<Box<dyn SiteParser>> = vec![
            Box::new(xiaohongshu::XiaohongshuParser::new(
                &config.endpoints.xiaohongshu_video_cdn,
            )),
            Box::new(douyin::DouyinParser::new()),
            Box::new(bilibili::BilibiliParser::new(&config.endpoints.bilibili_api)),
            Box::new(kuaishou::KuaishouParser::new()),
        ];

        Self {
            parsers: parsers.into_iter().map(|p| (p.platform(), p)).collect(),
        }
    }

    /// Parser for `platform`. Every [`PlatformId`] has one.
    #[must_use]
    pub fn get(&self, platform: PlatformId) -> &dyn SiteParser {
        match self.parsers.get(&platform) {
            Some(parser) => parser.as_ref(),
            None => unreachable!("registry is built with every platform"),
        }
    }

    /// Number of registered parsers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Compile a static marker table. Patterns are literals, so failure is a
/// programming error caught by the unit tests.
pub(crate) fn compile_markers(
    table: impl IntoIterator<Item = Result<Marker, regex::Error>>,
) -> Vec<Marker> {
    table
        .into_iter()
        .filter_map(|marker| match marker {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::error!(error = %e, "Invalid embedded-state marker");
                None
            }
        })
        .collect()
}

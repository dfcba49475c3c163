//! Parse orchestration.
//!
//! One pass through a fixed sequence of stages:
//!
//! ```text
//! Init -> Detected -> Fetched -> Decoded -> Mapped -> Succeeded
//!                                                 \-> FallbackAttempted -> Succeeded | Failed
//! ```
//!
//! An unrecognized URL ends at `Detected` with [`ParseOutcome::NotFound`]
//! before any network call. A failed primary fetch is terminal. Everything
//! after the fetch degrades instead of failing: a missing or undecodable state
//! blob only means the fallbacks get a turn, first a raw media key matched in
//! the markup, then the meta tags.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::ParseError;
use crate::http_client::PageClient;
use crate::platform::{detect, normalize_url, PlatformId};
use crate::record::VideoRecord;
use crate::site::{meta, ParserRegistry};

/// Result of one parse.
#[derive(Debug)]
pub enum ParseOutcome {
    Success(VideoRecord),
    /// The URL belongs to no supported platform.
    NotFound,
    Failure(ParseError),
}

impl ParseOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success(_))
    }

    /// Convert to a `Result`, mapping `NotFound` to
    /// [`ParseError::UnrecognizedPlatform`].
    pub fn into_result(self, url: &str) -> Result<VideoRecord, ParseError> {
        match self {
            ParseOutcome::Success(record) => Ok(record),
            ParseOutcome::NotFound => Err(ParseError::UnrecognizedPlatform(url.to_string())),
            ParseOutcome::Failure(err) => Err(err),
        }
    }
}

/// Orchestrator stages, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Detected,
    Fetched,
    Decoded,
    Mapped,
    FallbackAttempted,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Detected => "detected",
            Stage::Fetched => "fetched",
            Stage::Decoded => "decoded",
            Stage::Mapped => "mapped",
            Stage::FallbackAttempted => "fallback_attempted",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage, platform: Option<PlatformId>, url: &str) {
    debug!(stage = %stage, platform = ?platform, url = %url, "Parse stage");
}

/// Detects, fetches and extracts. Cheap to share across tasks.
pub struct Pipeline {
    client: PageClient,
    registry: ParserRegistry,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: PageClient, registry: ParserRegistry) -> Self {
        Self { client, registry }
    }

    /// Build the client and parser registry from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            PageClient::from_config(config)?,
            ParserRegistry::new(config),
        ))
    }

    #[must_use]
    pub fn client(&self) -> &PageClient {
        &self.client
    }

    /// Parse one URL.
    #[instrument(skip(self))]
    pub async fn parse(&self, input: &str) -> ParseOutcome {
        let url = normalize_url(input);
        enter(Stage::Init, None, &url);

        let Some(platform) = detect(&url) else {
            debug!("No platform matches");
            return ParseOutcome::NotFound;
        };
        enter(Stage::Detected, Some(platform), &url);

        let parser = self.registry.get(platform);
        let mut options = self.client.page_options();
        if let Some(profile) = parser.page_profile(&self.client) {
            options = options.with_profile(&profile);
        }

        let target = if platform.is_short_link(&url) {
            match self.client.resolve_redirect(&url, &options).await {
                Ok(resolved) => resolved,
                Err(e) => return fail_network(platform, &url, e.into()),
            }
        } else {
            url.clone()
        };

        let page = match self.client.fetch_page(&target, &options).await {
            Ok(page) => page,
            Err(e) => return fail_network(platform, &target, e.into()),
        };
        enter(Stage::Fetched, Some(platform), &page.url);

        // Decoding happens inside `extract`; parsers with API paths may not
        // need the page state at all.
        enter(Stage::Decoded, Some(platform), &page.url);
        let mapped = parser.extract(&page, &self.client).await;
        enter(Stage::Mapped, Some(platform), &page.url);

        let record = match mapped.and_then(VideoRecord::into_valid) {
            Some(record) => record,
            None => {
                enter(Stage::FallbackAttempted, Some(platform), &page.url);
                let fallback = parser
                    .raw_video_url(&page.body)
                    .and_then(|video_url| meta::extract_raw_media(&page.body, video_url))
                    .or_else(|| meta::extract_fallback(&page.body, parser.reads_og_video()));
                match fallback {
                    Some(record) => record,
                    None => {
                        enter(Stage::Failed, Some(platform), &page.url);
                        return ParseOutcome::Failure(ParseError::ExtractionFailed(page.url));
                    }
                }
            }
        };

        enter(Stage::Succeeded, Some(platform), &page.url);
        ParseOutcome::Success(VideoRecord {
            platform: Some(platform),
            url: page.url,
            ..record
        })
    }
}

fn fail_network(platform: PlatformId, url: &str, err: ParseError) -> ParseOutcome {
    warn!(platform = %platform, url = %url, error = %err, "Page fetch failed");
    enter(Stage::Failed, Some(platform), url);
    ParseOutcome::Failure(err)
}

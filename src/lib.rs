//! `vidpeek` - Short-video metadata extraction
//!
//! # Features
//!
//! - **Platform detection**: Xiaohongshu, Douyin, Bilibili and Kuaishou URLs, short links included
//! - **Browser-like fetching**: Chrome/Safari header profiles, HTTP/2, Brotli/Zstd, cookie jar
//! - **Embedded-state decoding**: hydration blobs in `<script>` tags, plain or percent-encoded
//! - **Stable output**: one [`VideoRecord`] schema across platforms, `og:*` fallback when state is missing
//!
//! # Example
//!
//! ```rust,no_run
//! use vidpeek::{Config, ParseOutcome, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::from_config(&Config::load()?)?;
//!     match pipeline.parse("https://www.bilibili.com/video/BV1xx411c7XZ").await {
//!         ParseOutcome::Success(record) => println!("{}", record.title),
//!         ParseOutcome::NotFound => println!("unsupported URL"),
//!         ParseOutcome::Failure(e) => println!("failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod pipeline;
pub mod platform;
pub mod record;
pub mod site;
pub mod state;

pub use config::Config;
pub use error::{DecodeError, FetchError, ParseError};
pub use fingerprint::{chrome_profile, mobile_safari_profile, BrowserProfile};
pub use http_client::{FetchOptions, PageClient, RawPage};
pub use pipeline::{ParseOutcome, Pipeline, Stage};
pub use platform::{detect, normalize_url, PlatformId};
pub use record::{
    Author, ExtractionSource, Image, Music, Statistics, VideoPart, VideoRecord, VideoVariant,
};
pub use site::{ParserRegistry, SiteParser};
pub use state::{extract_state, DecodedState, Marker};

/// Version of vidpeek
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

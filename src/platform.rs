//! Platform detection from raw URLs.
//!
//! Detection is pure substring matching over a fixed table. The table order
//! is the evaluation order; the first platform with a matching pattern wins.
//! No network access happens here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported short-video platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Xiaohongshu,
    Douyin,
    Bilibili,
    Kuaishou,
}

/// Detection table, in evaluation order.
const PATTERNS: &[(PlatformId, &[&str])] = &[
    (
        PlatformId::Xiaohongshu,
        &["xiaohongshu.com", "xhslink.com", "xhs.link"],
    ),
    (
        PlatformId::Douyin,
        &["douyin.com", "iesdouyin.com", "v.douyin.com"],
    ),
    (PlatformId::Bilibili, &["bilibili.com", "b23.tv", "acg.tv"]),
    (
        PlatformId::Kuaishou,
        &["kuaishou.com", "ksurl.cn", "gifshow.com"],
    ),
];

/// Domains that only redirect to the canonical page.
const SHORT_LINKS: &[(PlatformId, &[&str])] = &[
    (PlatformId::Xiaohongshu, &["xhslink.com"]),
    (PlatformId::Douyin, &["v.douyin.com", "iesdouyin.com"]),
    (PlatformId::Bilibili, &["b23.tv"]),
    (PlatformId::Kuaishou, &["ksurl.cn", "v.kuaishou.com"]),
];

impl PlatformId {
    /// All platforms in detection order.
    pub const ALL: [PlatformId; 4] = [
        PlatformId::Xiaohongshu,
        PlatformId::Douyin,
        PlatformId::Bilibili,
        PlatformId::Kuaishou,
    ];

    /// Lowercase identifier used in output records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Xiaohongshu => "xiaohongshu",
            PlatformId::Douyin => "douyin",
            PlatformId::Bilibili => "bilibili",
            PlatformId::Kuaishou => "kuaishou",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            PlatformId::Xiaohongshu => "Xiaohongshu (RED)",
            PlatformId::Douyin => "Douyin",
            PlatformId::Bilibili => "Bilibili",
            PlatformId::Kuaishou => "Kuaishou",
        }
    }

    /// Domain patterns recognized for this platform.
    #[must_use]
    pub fn domains(self) -> &'static [&'static str] {
        lookup(PATTERNS, self)
    }

    /// Returns `true` if `url` points at one of this platform's short-link
    /// domains and must be resolved before extraction.
    #[must_use]
    pub fn is_short_link(self, url: &str) -> bool {
        let normalized = url.trim().to_lowercase();
        lookup(SHORT_LINKS, self)
            .iter()
            .any(|domain| normalized.contains(domain))
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lookup(
    table: &'static [(PlatformId, &'static [&'static str])],
    platform: PlatformId,
) -> &'static [&'static str] {
    table
        .iter()
        .find(|(id, _)| *id == platform)
        .map(|(_, domains)| *domains)
        .unwrap_or_default()
}

/// Detect which platform a URL belongs to.
///
/// Input is trimmed and lower-cased before matching, so scheme, path and
/// query string do not matter.
#[must_use]
pub fn detect(url: &str) -> Option<PlatformId> {
    let normalized = url.trim().to_lowercase();
    PATTERNS
        .iter()
        .find(|(_, domains)| domains.iter().any(|d| normalized.contains(d)))
        .map(|(platform, _)| *platform)
}

/// Trim the input and prepend `https://` when it carries no scheme.
#[must_use]
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    }
}

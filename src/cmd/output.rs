use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use vidpeek::{detect, normalize_url, ParseError, ParseOutcome, PlatformId, VideoRecord};

/// Per-URL result envelope: `{url, platform, success, data, error}`.
#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub url: String,
    pub platform: Option<PlatformId>,
    pub success: bool,
    pub data: Option<VideoRecord>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ParseError> for ErrorBody {
    fn from(err: &ParseError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl ParseResponse {
    pub fn from_outcome(url: &str, outcome: ParseOutcome) -> Self {
        let platform = detect(&normalize_url(url));
        match outcome.into_result(url) {
            Ok(record) => Self {
                url: url.to_string(),
                platform: record.platform.or(platform),
                success: true,
                data: Some(record),
                error: None,
            },
            Err(err) => Self {
                url: url.to_string(),
                platform,
                success: false,
                data: None,
                error: Some(ErrorBody::from(&err)),
            },
        }
    }
}

/// Print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}

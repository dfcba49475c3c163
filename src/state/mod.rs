//! Embedded-state extraction.
//!
//! Pages on every supported platform inline their hydration state as a JSON
//! blob inside a `<script>` element. A [`Marker`] describes how to find one:
//! a cheap needle substring, a capture pattern bounded by a terminating
//! token, the span's encoding, and whether to scan the whole document or
//! individual script blocks.
//!
//! Extraction is best effort. A span that fails to decode is logged and
//! skipped; [`extract_state`] only ever answers "here is a tree" or "nothing".

pub mod path;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::DecodeError;

/// How the captured span is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Raw JSON (possibly with JavaScript `undefined` literals).
    Plain,
    /// Percent-encoded JSON. Spans that already look like JSON are left as is.
    Percent,
}

/// Where the capture pattern is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole page text.
    Document,
    /// The text of each inline `<script>` containing the needle.
    Script,
}

/// Locates one embedded-state blob.
#[derive(Debug, Clone)]
pub struct Marker {
    pub name: &'static str,
    /// Substring that must be present before the pattern is tried.
    pub needle: &'static str,
    /// Capture group 1 is the raw span.
    pattern: Regex,
    pub encoding: Encoding,
    pub scope: Scope,
}

impl Marker {
    pub fn new(
        name: &'static str,
        needle: &'static str,
        pattern: &str,
        encoding: Encoding,
        scope: Scope,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            needle,
            pattern: Regex::new(pattern)?,
            encoding,
            scope,
        })
    }

    /// Marker for `window.<global> = {...}` assignments.
    ///
    /// The span ends at the first `}` followed by one of the terminators
    /// (an optional `;` then `</script>`, a `;(function` IIFE, or end of
    /// script text), so braces nested inside the payload do not cut it short.
    pub fn assignment(name: &'static str, global: &'static str, scope: Scope) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"(?s){}\s*=\s*(\{{.*?\}})\s*(?:;?\s*</script>|;\s*\(function|;?\s*\z)",
            regex::escape(global)
        );
        Self::new(name, global, &pattern, Encoding::Plain, scope)
    }

    /// Raw span captured in `text`, if the pattern matches.
    #[must_use]
    pub fn capture<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A decoded state tree and the marker that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedState {
    pub marker: &'static str,
    pub root: Value,
}

/// Try each marker in order; the first span that decodes wins.
#[must_use]
pub fn extract_state(page: &str, markers: &[Marker]) -> Option<DecodedState> {
    let mut scripts: Option<Vec<String>> = None;

    for marker in markers {
        if !page.contains(marker.needle) {
            continue;
        }

        match marker.scope {
            Scope::Document => {
                if let Some(state) = marker.capture(page).and_then(|raw| decode(marker, raw)) {
                    return Some(state);
                }
            }
            Scope::Script => {
                let blocks = scripts.get_or_insert_with(|| script_blocks(page));
                let found = blocks
                    .iter()
                    .filter(|block| block.contains(marker.needle))
                    .find_map(|block| marker.capture(block).and_then(|raw| decode(marker, raw)));
                if found.is_some() {
                    return found;
                }
            }
        }
    }

    None
}

fn decode(marker: &Marker, raw: &str) -> Option<DecodedState> {
    match decode_span(raw, marker.encoding) {
        Ok(root) => {
            debug!(marker = marker.name, bytes = raw.len(), "Embedded state decoded");
            Some(DecodedState {
                marker: marker.name,
                root,
            })
        }
        Err(e) => {
            debug!(marker = marker.name, error = %e, "Embedded state present but undecodable");
            None
        }
    }
}

/// Decode a raw span into a JSON tree.
pub fn decode_span(raw: &str, encoding: Encoding) -> Result<Value, DecodeError> {
    let raw = raw.trim();
    let text: Cow<'_, str> = match encoding {
        Encoding::Percent if !raw.starts_with('{') => urlencoding::decode(raw)?,
        _ => Cow::Borrowed(raw),
    };
    let text = normalize_js_literals(&text);
    Ok(serde_json::from_str(&text)?)
}

/// First capture of `pattern` in `page`, read as the body of a JSON string
/// literal so escapes such as `\u002F` come out decoded.
///
/// This is the last-resort tier for pages whose state blob is missing or
/// broken but still mention a media key somewhere in their markup.
#[must_use]
pub fn capture_raw_string(page: &str, pattern: &Regex) -> Option<String> {
    let raw = pattern.captures(page)?.get(1)?.as_str();
    let value = serde_json::from_str::<String>(&format!("\"{raw}\""))
        .unwrap_or_else(|_| raw.to_string());
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Replace bare JavaScript `undefined` values with `null`.
///
/// Only tokens outside string literals are touched; a title that reads
/// "undefined" stays as written.
fn normalize_js_literals(text: &str) -> Cow<'_, str> {
    if !text.contains("undefined") {
        return Cow::Borrowed(text);
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
        } else if b == b'"' {
            in_string = true;
            i += 1;
        } else if is_ident_start(b) {
            let end = i + bytes[i..].iter().take_while(|c| is_ident_part(**c)).count();
            if &text[i..end] == "undefined" {
                out.push_str(&text[copied..i]);
                out.push_str("null");
                copied = end;
            }
            i = end;
        } else {
            i += 1;
        }
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid script selector"));

/// Text of every inline script in the page.
fn script_blocks(page: &str) -> Vec<String> {
    let document = Html::parse_document(page);
    document
        .select(&SCRIPT)
        .filter(|script| script.value().attr("src").is_none())
        .map(|script| script.text().collect::<String>())
        .collect()
}

//! Browser Fingerprint Headers
//!
//! The platforms serve reduced or blocked pages to clients that do not look
//! like a mainstream browser. Every request carries one of these profiles.

use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION,
    USER_AGENT,
};

/// Default language preference. The platforms localize aggressively and some
/// fields only exist in the Chinese page variants.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
}

/// Recent desktop Chrome releases
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.0.0"),
    ("130", "130.0.0.0"),
    ("129", "129.0.0.0"),
    ("128", "128.0.0.0"),
];

/// iOS releases for the mobile profile
const IOS_VERSIONS: &[(&str, &str)] = &[("17_5", "17.5"), ("17_4", "17.4"), ("16_6", "16.6")];

/// Generate a desktop Chrome profile on Windows.
#[must_use]
pub fn chrome_profile(accept_language: &str) -> BrowserProfile {
    let mut rng = rand::thread_rng();
    let (major, full) = CHROME_VERSIONS
        .choose(&mut rng)
        .copied()
        .unwrap_or(CHROME_VERSIONS[0]);

    let user_agent = format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36"
    );

    let brands = [
        format!("\"Google Chrome\";v=\"{major}\""),
        format!("\"Chromium\";v=\"{major}\""),
        "\"Not_A Brand\";v=\"24\"".to_string(),
    ];

    BrowserProfile {
        user_agent,
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        accept_language: accept_language.to_string(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        sec_ch_ua: brands.join(", "),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: "\"Windows\"".to_string(),
    }
}

/// Generate an iPhone Safari profile.
///
/// Douyin share pages only inline their render state for mobile clients.
#[must_use]
pub fn mobile_safari_profile(accept_language: &str) -> BrowserProfile {
    let mut rng = rand::thread_rng();
    let (os, version) = IOS_VERSIONS
        .choose(&mut rng)
        .copied()
        .unwrap_or(IOS_VERSIONS[0]);

    let user_agent = format!(
        "Mozilla/5.0 (iPhone; CPU iPhone OS {os} like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{version} Mobile/15E148 Safari/604.1"
    );

    BrowserProfile {
        user_agent,
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        accept_language: accept_language.to_string(),
        accept_encoding: "gzip, deflate, br".to_string(),
        // Safari doesn't send Sec-CH-UA headers
        sec_ch_ua: String::new(),
        sec_ch_ua_mobile: String::new(),
        sec_ch_ua_platform: String::new(),
    }
}

impl BrowserProfile {
    /// Convert profile to reqwest `HeaderMap`
    ///
    /// Values that are not valid header text are skipped rather than sent
    /// malformed.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        insert(&mut headers, USER_AGENT, &self.user_agent);
        insert(&mut headers, ACCEPT, &self.accept);
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language);
        insert(&mut headers, ACCEPT_ENCODING, &self.accept_encoding);
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        // Add Sec-CH-UA headers for Chrome
        if !self.sec_ch_ua.is_empty() {
            insert(&mut headers, HeaderName::from_static("sec-ch-ua"), &self.sec_ch_ua);
            insert(
                &mut headers,
                HeaderName::from_static("sec-ch-ua-mobile"),
                &self.sec_ch_ua_mobile,
            );
            insert(
                &mut headers,
                HeaderName::from_static("sec-ch-ua-platform"),
                &self.sec_ch_ua_platform,
            );
        }

        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        headers
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => tracing::debug!(header = %name, "skipping invalid header value"),
    }
}

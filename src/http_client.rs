//! Page Fetcher
//!
//! Features:
//! - Browser-like default headers (see [`crate::fingerprint`])
//! - Connection pooling with keep-alive, shared across concurrent parses
//! - Per-request timeouts (page fetches vs. secondary lookups)
//! - Redirect following for short links, with the final URL reported back
//! - Single attempt per call; retries are not this layer's business

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

use crate::config::{Config, Timeouts};
use crate::error::FetchError;
use crate::fingerprint::{chrome_profile, mobile_safari_profile, BrowserProfile};

/// A fetched page. Consumed once by extraction, never persisted.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Per-request settings layered over the client defaults.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Extra headers; these override the client's default browser headers.
    pub headers: HeaderMap,
}

impl FetchOptions {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            headers: HeaderMap::new(),
        }
    }

    /// Send this profile's headers instead of the client default.
    #[must_use]
    pub fn with_profile(mut self, profile: &BrowserProfile) -> Self {
        self.headers.extend(profile.to_headers());
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(referer) {
            self.headers.insert(REFERER, value);
        }
        self
    }
}

/// HTTP client shared by every parse.
pub struct PageClient {
    client: Client,
    profile: BrowserProfile,
    timeouts: Timeouts,
    accept_language: String,
}

impl PageClient {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    /// Create a client from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let profile = chrome_profile(&config.accept_language);

        let client = Client::builder()
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .default_headers(profile.to_headers())
            .connect_timeout(config.timeouts.connect())
            .timeout(config.timeouts.page())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            profile,
            timeouts: config.timeouts.clone(),
            accept_language: config.accept_language.clone(),
        })
    }

    /// Options for primary page fetches.
    #[must_use]
    pub fn page_options(&self) -> FetchOptions {
        FetchOptions::new(self.timeouts.page())
    }

    /// Options for secondary lookups.
    #[must_use]
    pub fn secondary_options(&self) -> FetchOptions {
        FetchOptions::new(self.timeouts.secondary())
    }

    /// A fresh mobile profile using the configured language.
    #[must_use]
    pub fn mobile_profile(&self) -> BrowserProfile {
        mobile_safari_profile(&self.accept_language)
    }

    /// Default desktop profile.
    #[must_use]
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    /// Send a GET and fail on non-2xx.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn get(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError> {
        let response = self.send(url, options).await?;
        let status = response.status();

        info!(
            status = %status,
            version = ?response.version(),
            final_url = %response.url(),
            "Response received"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Follow redirects from `url` and return where they end.
    ///
    /// The status of the final hop is not checked; the subsequent page fetch
    /// reports it.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn resolve_redirect(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        let response = self.send(url, options).await?;
        let resolved = response.url().to_string();
        debug!(resolved = %resolved, status = %response.status(), "Short link resolved");
        Ok(resolved)
    }

    /// Fetch a page body along with its final URL.
    pub async fn fetch_page(&self, url: &str, options: &FetchOptions) -> Result<RawPage, FetchError> {
        let response = self.get(url, options).await?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| FetchError::Body {
            url: final_url.clone(),
            source,
        })?;

        Ok(RawPage {
            url: final_url,
            status,
            body,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch and decode a JSON API response.
    pub async fn fetch_json(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<serde_json::Value, FetchError> {
        let response = self.get(url, options).await?;
        let final_url = response.url().to_string();
        response
            .json()
            .await
            .map_err(|source| FetchError::Body { url: final_url, source })
    }

    async fn send(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError> {
        url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        debug!(timeout = ?options.timeout, "Sending request");

        self.client
            .get(url)
            .headers(options.headers.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::header::USER_AGENT;

    #[test]
    fn options_use_configured_timeouts() {
        let client = PageClient::new().unwrap();
        assert_eq!(client.page_options().timeout, Duration::from_secs(10));
        assert_eq!(client.secondary_options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn profile_and_referer_become_request_headers() {
        let client = PageClient::new().unwrap();
        let options = client
            .page_options()
            .with_profile(&client.mobile_profile())
            .with_referer("https://www.bilibili.com/video/BV1/");
        let ua = options.headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(ua.contains("iPhone"));
        assert_eq!(
            options.headers.get(REFERER).unwrap(),
            "https://www.bilibili.com/video/BV1/"
        );
    }

    #[tokio::test]
    async fn invalid_url_fails_without_network() {
        let client = PageClient::new().unwrap();
        let err = client
            .fetch_page("not a url", &client.page_options())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn follows_redirects_and_reports_final_url() {
        let server = MockServer::start_async().await;
        let target = server.url("/final");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/short");
                then.status(302).header("Location", target.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/final");
                then.status(200).body("<html>ok</html>");
            })
            .await;

        let client = PageClient::new().unwrap();
        let options = client.page_options();
        let resolved = client
            .resolve_redirect(&server.url("/short"), &options)
            .await
            .unwrap();
        assert_eq!(resolved, target);

        let page = client.fetch_page(&server.url("/short"), &options).await.unwrap();
        assert_eq!(page.url, target);
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/blocked");
                then.status(403);
            })
            .await;

        let client = PageClient::new().unwrap();
        let err = client
            .fetch_page(&server.url("/blocked"), &client.page_options())
            .await
            .unwrap_err();
        match err {
            FetchError::Status { status, .. } => assert_eq!(status.as_u16(), 403),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn sends_browser_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/page")
                    .header_exists("user-agent")
                    .header_exists("accept-language");
                then.status(200).body("ok");
            })
            .await;

        let client = PageClient::new().unwrap();
        client
            .fetch_page(&server.url("/page"), &client.page_options())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_json_decodes_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"code":0,"data":{"n":1}}"#);
            })
            .await;

        let client = PageClient::new().unwrap();
        let value = client
            .fetch_json(&server.url("/api"), &client.secondary_options())
            .await
            .unwrap();
        assert_eq!(value["data"]["n"], 1);
    }
}

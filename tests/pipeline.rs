//! End-to-end pipeline scenarios against an in-process mock server.
//!
//! Detection is substring based, so mock paths embed the platform domain
//! (`/xhslink.com/abc123`) to route a local URL to the right parser.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use vidpeek::{Config, ExtractionSource, ParseOutcome, Pipeline, PlatformId, VideoRecord};

const BVID: &str = "BV1xx411c7XZ";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.endpoints.bilibili_api = server.url("");
    config
}

fn pipeline(config: &Config) -> Pipeline {
    Pipeline::from_config(config).expect("client builds")
}

fn expect_success(outcome: ParseOutcome) -> VideoRecord {
    match outcome {
        ParseOutcome::Success(record) => record,
        other => panic!("expected success, got {other:?}"),
    }
}

fn expect_failure_kind(outcome: ParseOutcome, kind: &str) {
    match outcome {
        ParseOutcome::Failure(err) => assert_eq!(err.kind(), kind, "{err}"),
        other => panic!("expected {kind} failure, got {other:?}"),
    }
}

// ─── Xiaohongshu ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn xiaohongshu_short_link_resolves_and_maps() {
    let server = MockServer::start_async().await;
    let page_url = server.url("/xiaohongshu.com/explore/n1");

    let short = server
        .mock_async(|when, then| {
            when.method(GET).path("/xhslink.com/abc123");
            then.status(302).header("Location", page_url.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xiaohongshu.com/explore/n1");
            then.status(200).body(
                r#"<html><head><script>window.__INITIAL_STATE__={"note":{"noteDetailMap":{"n1":{"note":{"title":"T","desc":"D","user":{"nickname":"U"},"interactInfo":{"likedCount":5}}}}}}</script></head></html>"#,
            );
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/xhslink.com/abc123"))
            .await,
    );

    short.assert_async().await;
    assert_eq!(record.platform, Some(PlatformId::Xiaohongshu));
    assert_eq!(record.url, page_url);
    assert_eq!(record.title, "T");
    assert_eq!(record.description, "D");
    assert_eq!(record.author.name, "U");
    assert_eq!(record.statistics.likes, 5);
    assert_eq!(record.source, ExtractionSource::EmbeddedState);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["platform"], "xiaohongshu");
    assert_eq!(json["author"]["name"], "U");
}

// ─── Bilibili ────────────────────────────────────────────────────────────────

async fn mock_bilibili_page(server: &MockServer, body: &str) {
    let body = body.to_string();
    server
        .mock_async(move |when, then| {
            when.method(GET).path(format!("/bilibili.com/video/{BVID}"));
            then.status(200).body(body);
        })
        .await;
}

#[tokio::test]
async fn bilibili_api_success_with_tags() {
    let server = MockServer::start_async().await;
    mock_bilibili_page(&server, "<html><head></head></html>").await;

    let view = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/x/web-interface/view")
                .query_param("bvid", BVID);
            then.status(200).json_body(json!({
                "code": 0,
                "data": {"title": "Vid", "owner": {"name": "A"}, "stat": {"like": 10, "view": 100}}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/x/tag/archive/tags")
                .query_param("bvid", BVID);
            then.status(200)
                .json_body(json!({"code": 0, "data": [{"tag_name": "music"}, {"tag_name": "cover"}]}));
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url(&format!("/bilibili.com/video/{BVID}")))
            .await,
    );

    view.assert_async().await;
    assert_eq!(record.platform, Some(PlatformId::Bilibili));
    assert_eq!(record.title, "Vid");
    assert_eq!(record.author.name, "A");
    assert_eq!(record.statistics.likes, 10);
    assert_eq!(record.statistics.views, 100);
    assert_eq!(record.tags, vec!["music", "cover"]);
    assert_eq!(record.source, ExtractionSource::Api);
    assert!(record.video_url.is_none());
}

#[tokio::test]
async fn bilibili_unknown_video_is_extraction_failure() {
    let server = MockServer::start_async().await;
    mock_bilibili_page(&server, "<html><head></head></html>").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/x/web-interface/view");
            then.status(200)
                .json_body(json!({"code": -1, "message": "啥都木有"}));
        })
        .await;

    let outcome = pipeline(&config_for(&server))
        .parse(&server.url(&format!("/bilibili.com/video/{BVID}")))
        .await;
    expect_failure_kind(outcome, "extraction_failed");
}

#[tokio::test]
async fn bilibili_secondary_failures_degrade_the_record() {
    let server = MockServer::start_async().await;
    mock_bilibili_page(&server, "<html></html>").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/x/web-interface/view");
            then.status(200).json_body(json!({
                "code": 0,
                "data": {"bvid": BVID, "title": "Vid", "pages": [{"cid": 4242}]}
            }));
        })
        .await;
    let tags = server
        .mock_async(|when, then| {
            when.method(GET).path("/x/tag/archive/tags");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/x/player/playurl")
                .query_param("cid", "4242")
                .header_exists("referer");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"code": 0, "data": {"durl": [{"url": "https://upos/late.mp4"}]}}));
        })
        .await;

    let mut config = config_for(&server);
    config.timeouts.secondary_secs = 1;

    let record = expect_success(
        pipeline(&config)
            .parse(&server.url(&format!("/bilibili.com/video/{BVID}")))
            .await,
    );

    tags.assert_async().await;
    assert_eq!(record.title, "Vid");
    assert!(record.tags.is_empty());
    assert!(record.video_url.is_none());
}

#[tokio::test]
async fn bilibili_api_outage_falls_back_to_embedded_state() {
    let server = MockServer::start_async().await;
    mock_bilibili_page(
        &server,
        &format!(
            r#"<html><script>window.__INITIAL_STATE__={{"videoData":{{"bvid":"{BVID}","title":"From page","owner":{{"name":"A"}},"stat":{{"like":3}}}},"tags":[{{"tag_name":"vlog"}}]}};(function(){{var s;}}());</script></html>"#
        ),
    )
    .await;

    let mut config = config_for(&server);
    // Nothing listens on port 1.
    config.endpoints.bilibili_api = "http://127.0.0.1:1".to_string();

    let record = expect_success(
        pipeline(&config)
            .parse(&server.url(&format!("/bilibili.com/video/{BVID}")))
            .await,
    );

    assert_eq!(record.title, "From page");
    assert_eq!(record.statistics.likes, 3);
    assert_eq!(record.tags, vec!["vlog"]);
    assert_eq!(record.source, ExtractionSource::EmbeddedState);
}

#[tokio::test]
async fn bilibili_play_url_resolved_from_page_cid() {
    let server = MockServer::start_async().await;
    mock_bilibili_page(
        &server,
        &format!(
            r#"<script>window.__INITIAL_STATE__={{"videoData":{{"bvid":"{BVID}","title":"T","pages":[{{"cid":99}}]}}}};</script>"#
        ),
    )
    .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/x/web-interface/view");
            then.status(503);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/x/tag/archive/tags");
            then.status(200).json_body(json!({"code": 0, "data": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/x/player/playurl")
                .query_param("bvid", BVID)
                .query_param("cid", "99")
                .query_param("qn", "80");
            then.status(200)
                .json_body(json!({"code": 0, "data": {"durl": [{"url": "https://upos-sz.bilivideo.com/v.mp4"}]}}));
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url(&format!("/bilibili.com/video/{BVID}")))
            .await,
    );

    assert_eq!(
        record.video_url.as_deref(),
        Some("https://upos-sz.bilivideo.com/v.mp4")
    );
}

// ─── Douyin / Kuaishou ───────────────────────────────────────────────────────

#[tokio::test]
async fn douyin_percent_encoded_render_data() {
    let server = MockServer::start_async().await;
    let state = json!({"app": {"videoDetail": {
        "desc": "dance  challenge",
        "author": {"nickname": "D"},
        "stats": {"diggCount": 42},
        "video": {"playAddr": {"urlList": ["https://v.douyinvod.com/1.mp4"]}}
    }}});
    let encoded = urlencoding::encode(&state.to_string()).into_owned();
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/douyin.com/video/7300")
                .header_exists("user-agent");
            then.status(200).body(format!(
                r#"<html><script id="RENDER_DATA" type="application/json">{encoded}</script></html>"#
            ));
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/douyin.com/video/7300"))
            .await,
    );

    assert_eq!(record.platform, Some(PlatformId::Douyin));
    assert_eq!(record.title, "dance challenge");
    assert_eq!(record.statistics.likes, 42);
    assert_eq!(record.video_url.as_deref(), Some("https://v.douyinvod.com/1.mp4"));
}

#[tokio::test]
async fn kuaishou_page_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/kuaishou.com/short-video/3x9");
            then.status(200).body(
                r#"<script>window.pageData = {"video":{"caption":"K","userName":"KU","likeCount":8,"mainMvUrls":[{"url":"https://k/v.mp4"}]}};</script>"#,
            );
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/kuaishou.com/short-video/3x9"))
            .await,
    );

    assert_eq!(record.platform, Some(PlatformId::Kuaishou));
    assert_eq!(record.title, "K");
    assert_eq!(record.author.name, "KU");
    assert_eq!(record.video_url.as_deref(), Some("https://k/v.mp4"));
}

// ─── Fallback and failures ───────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_state_falls_back_to_meta_tags() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/kuaishou.com/short-video/broken");
            then.status(200).body(
                r#"<html><head>
                <meta property="og:title" content="OG title">
                <meta property="og:image" content="https://k/cover.jpg">
                <meta property="og:video:url" content="https://k/og.mp4">
                <script>window.pageData = {"video": {caption: oops}};</script>
                </head></html>"#,
            );
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/kuaishou.com/short-video/broken"))
            .await,
    );

    assert_eq!(record.source, ExtractionSource::MetaTags);
    assert_eq!(record.platform, Some(PlatformId::Kuaishou));
    assert_eq!(record.title, "OG title");
    assert_eq!(record.cover.as_deref(), Some("https://k/cover.jpg"));
    assert_eq!(record.video_url.as_deref(), Some("https://k/og.mp4"));
}

#[tokio::test]
async fn broken_state_with_video_key_uses_raw_markup() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xiaohongshu.com/explore/raw");
            then.status(200).body(
                r#"<html><head><title>ignored</title>
                <meta name="description" content="Note from description">
                <script>window.__INITIAL_STATE__={"note":{"video":{"consumer":{"originVideoKey":"pre_post/abc"}}, broken</script>
                </head></html>"#,
            );
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/xiaohongshu.com/explore/raw"))
            .await,
    );

    assert_eq!(record.source, ExtractionSource::RawPattern);
    assert_eq!(record.platform, Some(PlatformId::Xiaohongshu));
    assert_eq!(record.title, "Note from description");
    assert_eq!(
        record.video_url.as_deref(),
        Some("http://sns-video-bd.xhscdn.com/stream/pre_post/abc")
    );
}

#[tokio::test]
async fn raw_media_key_titled_from_document_title() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/kuaishou.com/short-video/nostate");
            then.status(200).body(
                r#"<html><head><title>Kuaishou clip</title></head>
                <body><script>var player = {"srcNoMark":"https://k/nomark.mp4"};</script></body></html>"#,
            );
        })
        .await;

    let record = expect_success(
        pipeline(&config_for(&server))
            .parse(&server.url("/kuaishou.com/short-video/nostate"))
            .await,
    );

    assert_eq!(record.source, ExtractionSource::RawPattern);
    assert_eq!(record.title, "Kuaishou clip");
    assert_eq!(record.video_url.as_deref(), Some("https://k/nomark.mp4"));
}

#[tokio::test]
async fn page_without_state_or_meta_is_extraction_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xiaohongshu.com/explore/empty");
            then.status(200)
                .body("<html><head><title>小红书</title></head></html>");
        })
        .await;

    let outcome = pipeline(&config_for(&server))
        .parse(&server.url("/xiaohongshu.com/explore/empty"))
        .await;
    expect_failure_kind(outcome, "extraction_failed");
}

#[tokio::test]
async fn non_success_page_status_is_network_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/douyin.com/video/gone");
            then.status(404);
        })
        .await;

    let outcome = pipeline(&config_for(&server))
        .parse(&server.url("/douyin.com/video/gone"))
        .await;
    expect_failure_kind(outcome, "network_error");
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let outcome = pipeline(&Config::default())
        .parse("http://127.0.0.1:1/douyin.com/video/1")
        .await;
    expect_failure_kind(outcome, "network_error");
}

#[tokio::test]
async fn unrecognized_domain_makes_no_request() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).body("<html></html>");
        })
        .await;

    let outcome = pipeline(&config_for(&server))
        .parse("https://example.com/video")
        .await;

    assert!(matches!(outcome, ParseOutcome::NotFound));
    assert_eq!(any.hits_async().await, 0);
}

#[tokio::test]
async fn same_page_parses_identically() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/kuaishou.com/short-video/stable");
            then.status(200).body(
                r#"<script>window.pageData = {"video":{"caption":"same","timestamp":1700000000000,"viewCount":"1.5万"}};</script>"#,
            );
        })
        .await;

    let pipeline = pipeline(&config_for(&server));
    let url = server.url("/kuaishou.com/short-video/stable");
    let first = expect_success(pipeline.parse(&url).await);
    let second = expect_success(pipeline.parse(&url).await);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.statistics.views, 15_000);
}

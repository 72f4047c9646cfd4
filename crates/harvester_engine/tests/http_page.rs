use std::time::Duration;

use harvester_core::{HarvestError, HarvestSettings, HarvestStatus, ProgressPhase, ReviewSort};
use harvester_engine::{
    harvest_page, FailureKind, FetchSettings, HarvestHandle, HarvestJob, HarvestReport,
    HttpFeedPage, LogProgressSink, Page, RegionHandle, StopSignal,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn venues(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                r#"<div class="Nv2PK"><a class="hfpxzc" href="/maps/place/Venue+{i}&amp;hl=en" aria-label="Venue {i}"></a></div>"#
            )
        })
        .collect()
}

#[tokio::test]
async fn load_more_follows_next_link_until_there_is_none() {
    let server = MockServer::start().await;
    serve(&server, "/feed", r#"<p>one</p><a rel="next" href="/feed/2">More</a>"#).await;
    serve(&server, "/feed/2", "<p>one</p><p>two</p>").await;

    let page = HttpFeedPage::open(&format!("{}/feed", server.uri()), FetchSettings::default())
        .await
        .unwrap();
    let region = RegionHandle::new("html > body:nth-of-type(1)");

    page.load_more(&region).await.unwrap();
    assert!(page.current_url().path().ends_with("/feed/2"));
    let grown = page.snapshot().await.unwrap();
    assert!(grown.contains("two"));

    // Fully loaded: a further request is a no-op.
    page.load_more(&region).await.unwrap();
    assert_eq!(page.snapshot().await.unwrap(), grown);
}

#[tokio::test]
async fn activate_follows_the_target_link() {
    let server = MockServer::start().await;
    serve(&server, "/place", r#"<a href="/place/reviews">Reviews</a>"#).await;
    serve(&server, "/place/reviews", "<p>all reviews</p>").await;

    let page = HttpFeedPage::open(&format!("{}/place", server.uri()), FetchSettings::default())
        .await
        .unwrap();

    page.activate("html > body:nth-of-type(1) > a:nth-of-type(1)")
        .await
        .unwrap();
    assert!(page.snapshot().await.unwrap().contains("all reviews"));

    page.restore().await.unwrap();
    assert!(page.current_url().path().ends_with("/place"));
    assert!(!page.snapshot().await.unwrap().contains("all reviews"));
    let err = page.restore().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Unsupported);

    let err = page
        .activate("html > body:nth-of-type(1) > a:nth-of-type(3)")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::TargetMissing);
}

#[tokio::test]
async fn open_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = HttpFeedPage::open(&format!("{}/missing", server.uri()), FetchSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn open_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("slow").set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let err = HttpFeedPage::open(&format!("{}/slow", server.uri()), settings)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn open_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let err = HttpFeedPage::open(&format!("{}/large", server.uri()), settings)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn open_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = HttpFeedPage::open(&format!("{}/data", server.uri()), FetchSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        FailureKind::UnsupportedContentType { .. }
    ));
}

#[tokio::test]
async fn legacy_charsets_are_decoded() {
    let server = MockServer::start().await;
    let mut body = b"<html><body><p>Caf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"</p></body></html>");
    Mock::given(method("GET"))
        .and(path("/latin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=windows-1252"))
        .mount(&server)
        .await;

    let page = HttpFeedPage::open(&format!("{}/latin", server.uri()), FetchSettings::default())
        .await
        .unwrap();
    assert!(page.snapshot().await.unwrap().contains("Café"));
}

#[tokio::test(flavor = "multi_thread")]
async fn background_handle_harvests_a_paginated_feed() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let feed = |n: usize, tail: &str| format!(r#"<div role="feed">{}{tail}</div>"#, venues(n));
    serve(&server, "/search", &feed(4, r#"<a rel="next" href="/search/2">More</a>"#)).await;
    serve(&server, "/search/2", &feed(8, r#"<a rel="next" href="/search/3">More</a>"#)).await;
    serve(&server, "/search/3", &feed(11, r#"<div class="HlvSq">End of list</div>"#)).await;

    let job = HarvestJob::Listings {
        url: format!("{}/search", server.uri()),
    };
    let settings = HarvestSettings {
        scroll_delay_ms: 0,
        stabilize_delay_ms: 0,
        ..HarvestSettings::listings()
    };
    let handle = HarvestHandle::spawn(job, settings, FetchSettings::default()).unwrap();

    let (progress, report) = tokio::task::spawn_blocking(move || {
        let mut progress = Vec::new();
        let report = handle.wait(|event| progress.push((event.phase, event.count)));
        (progress, report)
    })
    .await
    .unwrap();

    let Some(HarvestReport::Listings(result)) = report else {
        panic!("expected a listings report");
    };
    assert_eq!(result.status, HarvestStatus::EndMarkerSeen);
    assert_eq!(result.records.len(), 11);
    assert_eq!(
        result.records[3].identity_url,
        format!("{}/maps/place/Venue+3", server.uri())
    );
    assert_eq!(
        progress,
        vec![
            (ProgressPhase::Scrolling, 4),
            (ProgressPhase::Loading, 8),
            (ProgressPhase::Loading, 11),
            (ProgressPhase::Processing, 11),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_page_reports_failure() {
    let job = HarvestJob::Reviews {
        url: "not a url".to_string(),
        sort: Default::default(),
    };
    let handle =
        HarvestHandle::spawn(job, HarvestSettings::reviews(), FetchSettings::default()).unwrap();
    let report = tokio::task::spawn_blocking(move || handle.wait(|_| {}))
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(report, HarvestReport::Reviews(_)));
    assert_eq!(report.status(), HarvestStatus::Failed);
    assert!(report.error().is_some());
}

#[tokio::test]
async fn sort_link_leading_away_from_the_reviews_is_undone() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    serve(
        &server,
        "/place",
        r#"<h1>Café Rouge</h1>
        <nav><a href="/news">Latest news</a></nav>
        <div role="feed">
            <div class="jftiEf" data-review-id="r1">
                <div class="d4r55">Ann</div>
                <span class="wiI7pd">Lovely soup</span>
            </div>
        </div>"#,
    )
    .await;
    serve(&server, "/news", "<h1>News</h1><p>Opening hours changed</p>").await;

    let url = format!("{}/place", server.uri());
    let page = HttpFeedPage::open(&url, FetchSettings::default()).await.unwrap();
    let job = HarvestJob::Reviews {
        url,
        sort: ReviewSort::Newest,
    };
    let settings = HarvestSettings {
        scroll_delay_ms: 0,
        stabilize_delay_ms: 0,
        ..HarvestSettings::reviews()
    };

    let report = harvest_page(
        &job,
        &page,
        Some(page.current_url()),
        settings,
        &StopSignal::new(),
        &LogProgressSink,
    )
    .await;

    let HarvestReport::Reviews(result) = report else {
        panic!("expected a reviews report");
    };
    assert_eq!(result.status, HarvestStatus::Converged);
    assert_eq!(result.error, None);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].author, "Ann");
    assert_eq!(result.records[0].subject_name, "Café Rouge");
    assert!(matches!(
        result.warnings.as_slice(),
        [HarvestError::SortApplication {
            order: ReviewSort::Newest,
            ..
        }]
    ));
    assert!(page.current_url().path().ends_with("/place"));
}

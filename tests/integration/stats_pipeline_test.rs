// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use statsrs::domain::models::{RunSnapshot, SelectorKind, SiteStatus};
use statsrs::domain::repositories::stats_repository::StatsRepository;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_full_run_persists_ordered_snapshot() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/registry"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><p class='count'>Total: 1,234 servers</p></body></html>",
        ))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><div class='stats'><span data-count='57'></span></div></body></html>",
        ))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.server)
        .await;

    let sites = vec![
        app.site("registry", "/registry", ".count"),
        app.site("catalog", "/catalog", ".server-count")
            .with_fallbacks(vec![SelectorKind::parse("[data-count]")]),
        app.site("broken", "/broken", ".count"),
    ];

    let snapshot = app.coordinator.run(&sites).await.unwrap();

    let names: Vec<&str> = snapshot.sites.iter().map(|s| s.site_name.as_str()).collect();
    assert_eq!(names, vec!["registry", "catalog", "broken"]);
    assert_eq!(snapshot.sites[0].server_count, Some(1234));
    assert_eq!(snapshot.sites[1].server_count, Some(57));
    assert_eq!(snapshot.sites[2].status, SiteStatus::Failure);
    assert_eq!(
        snapshot.sites[2].error_message.as_deref(),
        Some("http_error: HTTP 500")
    );
    assert_eq!(snapshot.success_count, 2);
    assert_eq!(snapshot.total_count, 3);
    assert_eq!(snapshot.total_servers, 1291);

    // The latest document on disk matches the returned snapshot.
    let raw = std::fs::read(app.store.latest_path()).unwrap();
    let on_disk: RunSnapshot = serde_json::from_slice(&raw).unwrap();
    assert_eq!(on_disk.generated_at, snapshot.generated_at);
    assert_eq!(on_disk.total_servers, snapshot.total_servers);
    let on_disk_counts: Vec<Option<u64>> = on_disk.sites.iter().map(|s| s.server_count).collect();
    assert_eq!(on_disk_counts, vec![Some(1234), Some(57), None]);

    let history = app.store.read_history(None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history
        .windows(2)
        .all(|pair| pair[0].crawled_at >= pair[1].crawled_at));

    let snapshots = std::fs::read_dir(app.store.snapshot_dir()).unwrap().count();
    assert_eq!(snapshots, 1);
}

#[tokio::test]
async fn test_empty_site_list_is_persisted() {
    let app = create_test_app().await;

    let snapshot = app.coordinator.run(&[]).await.unwrap();

    assert_eq!(snapshot.total_count, 0);
    assert_eq!(snapshot.total_servers, 0);
    let latest = app.store.read_latest().await.unwrap().unwrap();
    assert_eq!(latest, snapshot);
}

#[tokio::test]
async fn test_rate_limited_site_retries_through_challenge() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/protected"))
        .respond_with(ResponseTemplate::new(503).set_body_string(
            "<html><title>Just a moment...</title><body>Checking your browser</body></html>",
        ))
        .up_to_n_times(2)
        .expect(2)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/protected"))
        .and(header_exists("referer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<h1>Browse 4,210 MCP Servers</h1>"),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let site = app
        .site("protected", "/protected", "h1:contains('MCP Servers')")
        .rate_limited(0.0, 2)
        .with_referer("https://www.google.com/");

    let snapshot = app.coordinator.run(&[site]).await.unwrap();

    assert_eq!(snapshot.sites[0].status, SiteStatus::Success);
    assert_eq!(snapshot.sites[0].server_count, Some(4210));
}

#[tokio::test]
async fn test_unprotected_site_fails_after_single_attempt() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&app.server)
        .await;

    let mut site = app.site("flaky", "/flaky", ".count");
    site.max_retries = 3;

    let snapshot = app.coordinator.run(&[site]).await.unwrap();

    assert_eq!(
        snapshot.sites[0].error_message.as_deref(),
        Some("http_error: HTTP 503")
    );
}

#[tokio::test]
async fn test_slow_site_times_out() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p class='count'>3</p>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&app.server)
        .await;

    let site = app.site("slow", "/slow", ".count").with_timeout(0.5);

    let snapshot = app.coordinator.run(&[site]).await.unwrap();

    let message = snapshot.sites[0].error_message.clone().unwrap();
    assert!(message.starts_with("timeout: "), "{}", message);
    assert!(snapshot.sites[0].response_time_seconds < 3.0);
}

#[tokio::test]
async fn test_read_latest_is_idempotent_after_run() {
    let app = create_test_app().await;

    Mock::given(method("GET"))
        .and(path("/registry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<b class='n'>9</b>"))
        .mount(&app.server)
        .await;

    app.coordinator
        .run(&[app.site("registry", "/registry", ".n")])
        .await
        .unwrap();

    let first = app.store.read_latest().await.unwrap();
    let second = app.store.read_latest().await.unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use statsrs::config::site_source::FileSiteSource;
use statsrs::domain::repositories::stats_repository::StatsRepository;
use statsrs::utils::errors::{SiteConfigError, TickError};
use statsrs::workers::{SchedulerState, StatsScheduler, TickOutcome, Worker};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn sites_toml(base: &str) -> String {
    format!(
        r#"
[[sites]]
name = "registry"
url = "{base}/registry"
primary_selector = ".server-count"
fallback_selectors = ["[data-count]"]
timeout_seconds = 5

[[sites]]
name = "directory"
url = "{base}/directory"
primary_selector = {{ kind = "text_contains", pattern = "servers" }}
timeout_seconds = 5
"#
    )
}

#[tokio::test]
async fn test_run_once_with_file_source() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .and(path("/registry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<span data-count='57'></span>"))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<p>Showing 1-30 of 1,158 servers</p>"),
        )
        .mount(&app.server)
        .await;

    let sites_path = app.dir.path().join("sites.toml");
    std::fs::write(&sites_path, sites_toml(&app.server.uri())).unwrap();
    let scheduler =
        StatsScheduler::new(app.coordinator.clone(), Arc::new(FileSiteSource::new(&sites_path)), 24.0)
            .unwrap();

    let snapshot = scheduler.run_once().await.unwrap();

    assert_eq!(snapshot.total_servers, 57 + 1158);
    let latest = app.store.read_latest().await.unwrap().unwrap();
    assert_eq!(latest.generated_at, snapshot.generated_at);
    assert_eq!(latest.total_servers, snapshot.total_servers);
    assert_eq!(scheduler.status().ticks_completed, 1);
}

#[tokio::test]
async fn test_broken_site_file_fails_tick_without_writing() {
    let app = create_test_app().await;
    let sites_path = app.dir.path().join("sites.toml");
    std::fs::write(
        &sites_path,
        "[[sites]]\nname = \"a\"\nurl = \"ftp://a.example\"\nprimary_selector = \".n\"\n",
    )
    .unwrap();
    let scheduler =
        StatsScheduler::new(app.coordinator.clone(), Arc::new(FileSiteSource::new(&sites_path)), 1.0)
            .unwrap();

    let err = scheduler.run_once().await.unwrap_err();

    assert!(matches!(err, TickError::Config(SiteConfigError::Invalid { .. })));
    assert!(app.store.read_latest().await.unwrap().is_none());
    let status = scheduler.status();
    assert_eq!(status.ticks_failed, 1);
    assert!(matches!(
        status.last_tick.map(|t| t.outcome),
        Some(TickOutcome::Failed { .. })
    ));
}

#[tokio::test]
async fn test_scheduler_loop_stops_on_cancel() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<b class='server-count'>4</b>"))
        .mount(&app.server)
        .await;

    let sites_path = app.dir.path().join("sites.toml");
    std::fs::write(&sites_path, sites_toml(&app.server.uri())).unwrap();
    let scheduler = Arc::new(
        StatsScheduler::new(app.coordinator.clone(), Arc::new(FileSiteSource::new(&sites_path)), 24.0)
            .unwrap(),
    );

    let token = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let token = token.clone();
        tokio::spawn(async move { scheduler.run(token).await })
    };

    // Wait for the first tick to land on disk.
    let mut waited = Duration::ZERO;
    while app.store.read_latest().await.unwrap().is_none() && waited < Duration::from_secs(10) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    let latest = app.store.read_latest().await.unwrap().unwrap();
    assert_eq!(latest.sites[0].server_count, Some(4));
    assert_eq!(scheduler.status().state, SchedulerState::Stopped);
}

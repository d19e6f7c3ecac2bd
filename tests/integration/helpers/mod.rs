// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use statsrs::config::settings::HttpSettings;
use statsrs::domain::models::{SelectorKind, SiteSpec};
use statsrs::domain::services::crawl_service::SiteCrawler;
use statsrs::domain::services::stats_run_service::StatsRunCoordinator;
use statsrs::engines::reqwest_engine::ReqwestEngine;
use statsrs::engines::site_fetcher::SiteFetcher;
use statsrs::infrastructure::storage::FileStatsStore;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

pub type FileCoordinator = StatsRunCoordinator<ReqwestEngine, FileStatsStore>;

/// 真实 HTTP 引擎 + 临时目录文件存储
#[allow(dead_code)]
pub struct TestApp {
    pub server: MockServer,
    pub dir: TempDir,
    pub store: Arc<FileStatsStore>,
    pub coordinator: Arc<FileCoordinator>,
}

pub async fn create_test_app() -> TestApp {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = Arc::new(FileStatsStore::new(dir.path().join("stats")));

    let engine = Arc::new(ReqwestEngine::new(&HttpSettings::default()).expect("failed to build client"));
    let crawler = SiteCrawler::new(SiteFetcher::new(engine));
    let coordinator = Arc::new(StatsRunCoordinator::new(crawler, store.clone()));

    TestApp {
        server,
        dir,
        store,
        coordinator,
    }
}

impl TestApp {
    /// 指向 mock 服务器上某个路径的站点
    pub fn site(&self, name: &str, route: &str, primary: &str) -> SiteSpec {
        SiteSpec::new(
            name,
            format!("{}{}", self.server.uri(), route),
            SelectorKind::parse(primary),
        )
        .with_timeout(5.0)
    }
}

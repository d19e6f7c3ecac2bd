// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::domain::models::{SiteResult, SiteSpec};
use crate::domain::services::extraction_service::ExtractionService;
use crate::engines::site_fetcher::SiteFetcher;
use crate::engines::traits::PageEngine;

/// 站点爬取服务
///
/// 对单个站点执行 抓取 -> 提取，并把所有失败转为失败结果。
/// `crawl_one` 永远不会返回错误。
pub struct SiteCrawler<E: PageEngine + ?Sized> {
    fetcher: SiteFetcher<E>,
}

impl<E: PageEngine + ?Sized> Clone for SiteCrawler<E> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<E: PageEngine + ?Sized> SiteCrawler<E> {
    pub fn new(fetcher: SiteFetcher<E>) -> Self {
        Self { fetcher }
    }

    /// 爬取单个站点
    pub async fn crawl_one(&self, site: &SiteSpec) -> SiteResult {
        self.crawl_one_at(site, Utc::now()).await
    }

    /// 爬取单个站点，`crawled_at` 不早于 `run_started_at`
    #[instrument(skip(self, site, run_started_at), fields(site = %site.name))]
    pub async fn crawl_one_at(&self, site: &SiteSpec, run_started_at: DateTime<Utc>) -> SiteResult {
        let started = Instant::now();

        let outcome = match self.fetcher.fetch(site).await {
            Ok(page) => ExtractionService::extract(&page.body, site)
                .map_err(|e| format!("extraction failed: {}", e)),
            Err(e) => Err(e.describe()),
        };

        let elapsed = started.elapsed();
        let crawled_at = Utc::now().max(run_started_at);

        let result = match outcome {
            Ok(count) => {
                info!(server_count = count, elapsed_ms = elapsed.as_millis() as u64, "site crawled");
                SiteResult::success(&site.name, count, elapsed, crawled_at)
            }
            Err(message) => {
                warn!(elapsed_ms = elapsed.as_millis() as u64, "site crawl failed: {}", message);
                SiteResult::failure(&site.name, message, elapsed, crawled_at)
            }
        };

        record_crawl(&result, elapsed);
        result
    }
}

fn record_crawl(result: &SiteResult, elapsed: Duration) {
    metrics::counter!(
        "stats_site_crawls_total",
        "site" => result.site_name.clone(),
        "status" => result.status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "stats_site_crawl_duration_seconds",
        "site" => result.site_name.clone()
    )
    .record(elapsed.as_secs_f64());
}

#[cfg(test)]
#[path = "crawl_service_test.rs"]
mod tests;

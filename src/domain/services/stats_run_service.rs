// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::models::{RunSnapshot, SiteResult, SiteSpec};
use crate::domain::repositories::stats_repository::{StatsRepository, StorageError};
use crate::domain::services::crawl_service::SiteCrawler;
use crate::engines::traits::PageEngine;
use crate::utils::errors::panic_message;

/// 默认并发爬取的站点数
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// 统计运行错误
///
/// 站点级失败不会出现在这里，它们记录在快照的失败结果中
#[derive(Error, Debug)]
pub enum StatsRunError {
    #[error("failed to persist run snapshot: {0}")]
    Persistence(#[from] StorageError),
}

/// 统计运行协调器
///
/// 并发爬取所有站点，按输入顺序组装快照，并只写入一次仓库
pub struct StatsRunCoordinator<E: PageEngine + ?Sized, R: StatsRepository + ?Sized> {
    crawler: SiteCrawler<E>,
    repository: Arc<R>,
    max_concurrency: usize,
}

impl<E: PageEngine + ?Sized, R: StatsRepository + ?Sized> StatsRunCoordinator<E, R> {
    pub fn new(crawler: SiteCrawler<E>, repository: Arc<R>) -> Self {
        Self {
            crawler,
            repository,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// 设置并发上限，至少为 1
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// 执行一次完整的统计运行
    ///
    /// 快照中的结果顺序与 `sites` 一致，与完成顺序无关。单个站点的失败
    /// （包括 panic）只会变成失败结果；持久化失败作为错误返回。
    pub async fn run(&self, sites: &[SiteSpec]) -> Result<RunSnapshot, StatsRunError> {
        let run_started_at = Utc::now();
        info!(
            sites = sites.len(),
            max_concurrency = self.max_concurrency,
            "starting stats run"
        );

        let mut slots: Vec<Option<SiteResult>> = vec![None; sites.len()];
        let tasks: Vec<_> = sites
            .iter()
            .enumerate()
            .map(|(index, site)| async move {
                let result = AssertUnwindSafe(self.crawler.crawl_one_at(site, run_started_at))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!(site = %site.name, "site crawl panicked: {}", message);
                        SiteResult::failure(
                            &site.name,
                            format!("internal error: {}", message),
                            Duration::ZERO,
                            Utc::now().max(run_started_at),
                        )
                    });
                (index, result)
            })
            .collect();
        let mut completed = stream::iter(tasks).buffer_unordered(self.max_concurrency);

        while let Some((index, result)) = completed.next().await {
            slots[index] = Some(result);
        }

        let results: Vec<SiteResult> = slots.into_iter().flatten().collect();
        let snapshot = RunSnapshot::new(Utc::now().max(run_started_at), results);

        self.repository.write(&snapshot).await?;

        info!(
            success = snapshot.success_count,
            total = snapshot.total_count,
            total_servers = snapshot.total_servers,
            "stats run completed"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "stats_run_service_test.rs"]
mod tests;

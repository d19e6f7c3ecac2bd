// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::SiteSpec;
use crate::engines::protection;
use crate::engines::traits::{FetchError, FetchRequest, PageContent, PageEngine};
use crate::utils::retry_policy::RetryPolicy;

/// 站点抓取器
///
/// 在单次请求的引擎之上实现站点级协议：合并请求头、防护站点的
/// 请求前延迟和有限次重试。普通站点只请求一次。
pub struct SiteFetcher<E: PageEngine + ?Sized> {
    engine: Arc<E>,
    jitter: Duration,
}

impl<E: PageEngine + ?Sized> Clone for SiteFetcher<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            jitter: self.jitter,
        }
    }
}

impl<E: PageEngine + ?Sized> SiteFetcher<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            jitter: Duration::ZERO,
        }
    }

    /// 设置防护站点的随机抖动上限
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// 抓取站点页面
    ///
    /// 防护站点在每次请求前等待 `request_delay_seconds`，失败后最多重试
    /// `max_retries` 次，首次成功即返回；全部失败时返回最后一次的错误。
    pub async fn fetch(&self, site: &SiteSpec) -> Result<PageContent, FetchError> {
        let policy = RetryPolicy::for_site(site, self.jitter);
        let mut attempt: u32 = 0;

        loop {
            // Headers are rebuilt per attempt so protected sites rotate user agents.
            let request = FetchRequest {
                url: site.url.clone(),
                headers: protection::build_headers(site),
                timeout: site.timeout(),
            };

            if site.is_rate_limited() {
                let delay = policy.delay_before_attempt();
                if !delay.is_zero() {
                    debug!(site = %site.name, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "waiting before request");
                    sleep(delay).await;
                }
            }

            match self.engine.fetch_page(&request).await {
                Ok(page) => return Ok(page),
                Err(e) if policy.should_retry(attempt) => {
                    warn!(
                        site = %site.name,
                        engine = self.engine.name(),
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts(),
                        transient = e.is_transient(),
                        "fetch failed, retrying: {}",
                        e.describe()
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "site_fetcher_test.rs"]
mod tests;

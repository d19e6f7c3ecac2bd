// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::settings::HttpSettings;
use crate::engines::protection;
use crate::engines::traits::{FetchError, FetchRequest, PageContent, PageEngine};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use tracing::debug;

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎。引擎持有一个共享的 `reqwest::Client`
/// （连接池、Cookie、压缩），由调用方显式创建并传入抓取器，
/// 不使用任何全局状态。
#[derive(Clone)]
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    /// 根据 HTTP 配置创建引擎
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .pool_idle_timeout(Duration::from_secs(settings.pool_idle_timeout_seconds))
            .build()
            .map_err(|e| FetchError::Connection(format!("failed to build http client: {}", e)))?;

        Ok(Self { client })
    }

    fn map_error(error: reqwest::Error, timeout: Duration) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else if let Some(status) = error.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Connection(error.to_string())
        }
    }
}

#[async_trait]
impl PageEngine for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(PageContent)` - 2xx 且不是挑战页
    /// * `Err(FetchError)` - 超时、连接错误、非 2xx 状态码或挑战页
    async fn fetch_page(&self, request: &FetchRequest) -> Result<PageContent, FetchError> {
        // Build headers
        let mut headers = HeaderMap::new();
        for (k, v) in &request.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }

        let start = Instant::now();
        let response = self
            .client
            .get(&request.url)
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(e, request.timeout))?;

        let status_code = response.status().as_u16();
        // The body is read even for error statuses so challenge pages can be recognised.
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, request.timeout))?;
        let response_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            url = %request.url,
            status = status_code,
            bytes = body.len(),
            elapsed_ms = response_time_ms,
            "page fetched"
        );

        if let Some(marker) = protection::detect_challenge(status_code, &body) {
            return Err(FetchError::Blocked(marker));
        }

        if !(200..300).contains(&status_code) {
            return Err(FetchError::Http {
                status: status_code,
            });
        }

        Ok(PageContent {
            status_code,
            body,
            response_time_ms,
        })
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;

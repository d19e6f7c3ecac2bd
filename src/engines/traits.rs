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

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 抓取错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    HttpError,
    ConnectionError,
    Blocked,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::HttpError => "http_error",
            FetchErrorKind::ConnectionError => "connection_error",
            FetchErrorKind::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

/// 抓取错误类型
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// 超时
    #[error("request exceeded {0:?}")]
    Timeout(Duration),
    /// 非成功状态码
    #[error("HTTP {status}")]
    Http { status: u16 },
    /// 连接失败、DNS 错误、读取响应体失败等
    #[error("{0}")]
    Connection(String),
    /// 命中反爬挑战页
    #[error("anti-automation challenge detected ({0})")]
    Blocked(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::Http { .. } => FetchErrorKind::HttpError,
            FetchError::Connection(_) => FetchErrorKind::ConnectionError,
            FetchError::Blocked(_) => FetchErrorKind::Blocked,
        }
    }

    /// 判断错误是否属于临时性错误
    ///
    /// 仅用于日志分级，防护站点的重试不区分错误类型
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connection(_) | FetchError::Blocked(_) => true,
            FetchError::Http { status } => *status == 429 || *status >= 500,
        }
    }

    /// 形如 `timeout: request exceeded 30s` 的描述，写入失败结果
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 请求头（已合并默认值）
    pub headers: HashMap<String, String>,
    /// 超时时间
    pub timeout: Duration,
}

/// 页面内容
#[derive(Debug, Clone)]
pub struct PageContent {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub body: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 页面抓取引擎特质
///
/// 负责单次 HTTP 请求；延迟和重试由 [`crate::engines::site_fetcher::SiteFetcher`] 处理
#[async_trait]
pub trait PageEngine: Send + Sync {
    /// 执行一次请求
    async fn fetch_page(&self, request: &FetchRequest) -> Result<PageContent, FetchError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 站点爬取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Success,
    Failure,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Success => write!(f, "success"),
            SiteStatus::Failure => write!(f, "failure"),
        }
    }
}

/// 单个站点在一次运行中的爬取结果
///
/// 由爬取服务创建，创建后不再修改。`server_count` 仅在成功时存在，
/// `error_message` 仅在失败时存在，这一点由构造函数保证。
/// 同一结构也是历史记录中的一行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteResult {
    /// 站点名称
    pub site_name: String,
    /// 服务器数量
    pub server_count: Option<u64>,
    /// 状态
    pub status: SiteStatus,
    /// 错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// 响应时间（秒）
    pub response_time_seconds: f64,
    /// 爬取完成时间
    pub crawled_at: DateTime<Utc>,
}

impl SiteResult {
    /// 创建成功结果
    pub fn success(
        site_name: impl Into<String>,
        server_count: u64,
        response_time: Duration,
        crawled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            server_count: Some(server_count),
            status: SiteStatus::Success,
            error_message: None,
            response_time_seconds: response_time.as_secs_f64(),
            crawled_at,
        }
    }

    /// 创建失败结果
    pub fn failure(
        site_name: impl Into<String>,
        error_message: impl Into<String>,
        response_time: Duration,
        crawled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            server_count: None,
            status: SiteStatus::Failure,
            error_message: Some(error_message.into()),
            response_time_seconds: response_time.as_secs_f64(),
            crawled_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SiteStatus::Success
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::site_result::SiteResult;

/// 一次调度运行的完整结果
///
/// `sites` 与配置中的站点顺序一致，汇总字段由 [`RunSnapshot::new`] 计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// 生成时间
    pub generated_at: DateTime<Utc>,
    /// 各站点结果
    pub sites: Vec<SiteResult>,
    /// 成功站点数
    pub success_count: usize,
    /// 站点总数
    pub total_count: usize,
    /// 成功站点的服务器数量之和
    pub total_servers: u64,
}

impl RunSnapshot {
    pub fn new(generated_at: DateTime<Utc>, sites: Vec<SiteResult>) -> Self {
        let success_count = sites.iter().filter(|s| s.is_success()).count();
        let total_servers = sites
            .iter()
            .filter(|s| s.is_success())
            .filter_map(|s| s.server_count)
            .sum();
        let total_count = sites.len();

        Self {
            generated_at,
            sites,
            success_count,
            total_count,
            total_servers,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.total_count - self.success_count
    }
}

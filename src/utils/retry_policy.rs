// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::domain::models::SiteSpec;

/// 重试策略配置
///
/// 防护站点每次请求前等待固定延迟，可叠加随机抖动；
/// 普通站点只请求一次，不等待。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 每次请求前的固定延迟
    pub delay: Duration,
    /// 最大抖动（在 [0, jitter) 区间内均匀分布）
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    /// 只请求一次的策略
    pub fn single_attempt() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// 根据站点配置创建策略
    pub fn for_site(site: &SiteSpec, jitter: Duration) -> Self {
        if !site.is_rate_limited() {
            return Self::single_attempt();
        }

        Self {
            max_retries: site.max_retries,
            delay: site.request_delay(),
            jitter,
        }
    }

    /// 总请求次数上限
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 第 `attempt` 次请求（从 0 开始）之后是否还能重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 请求前的等待时间
    pub fn delay_before_attempt(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter = rand::random_range(0.0..self.jitter.as_secs_f64());
        self.delay + Duration::from_secs_f64(jitter)
    }
}

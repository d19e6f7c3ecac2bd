// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::services::stats_run_service::StatsRunError;

/// 站点配置错误
#[derive(Error, Debug)]
pub enum SiteConfigError {
    #[error("failed to load site configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid site '{site}': {reason}")]
    Invalid { site: String, reason: String },

    #[error("duplicate site name: {0}")]
    DuplicateName(String),
}

/// 单次调度（tick）错误
///
/// 站点级别的失败已在爬取服务中转为失败结果，这里只包含整次运行的失败
#[derive(Error, Debug)]
pub enum TickError {
    #[error("site configuration error: {0}")]
    Config(#[from] SiteConfigError),

    #[error("stats run failed: {0}")]
    Run(#[from] StatsRunError),

    #[error("tick panicked: {0}")]
    Panicked(String),
}

/// 调度器错误
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid scheduler interval: {0} hours (must be finite and greater than zero)")]
    InvalidInterval(f64),
}

/// 把 panic 负载转为可读文本
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

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

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::models::SiteSpec;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "STATSRS_CONFIG";

/// 默认配置文件（不含扩展名）
pub const DEFAULT_CONFIG_FILE: &str = "config/default";

/// 应用程序配置设置
///
/// 包含调度、存储、HTTP、防护、日志、指标和站点列表等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 调度配置
    pub scheduler: SchedulerSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// HTTP 客户端配置
    pub http: HttpSettings,
    /// 反爬防护配置
    pub protection: ProtectionSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 内联站点列表
    #[serde(default)]
    pub sites: Vec<SiteSpec>,
    /// 独立的站点列表文件，设置后优先于内联列表
    #[serde(default)]
    pub sites_file: Option<PathBuf>,
}

/// 调度配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 调度间隔（小时）
    pub interval_hours: f64,
    /// 单次运行内同时爬取的站点数
    pub max_concurrency: usize,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 输出目录
    pub output_dir: PathBuf,
}

/// HTTP 客户端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// 默认 User-Agent
    pub user_agent: String,
    /// 连接池空闲超时（秒）
    pub pool_idle_timeout_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: crate::engines::protection::DEFAULT_USER_AGENT.to_string(),
            pool_idle_timeout_seconds: 90,
        }
    }
}

/// 防护配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectionSettings {
    /// 防护站点请求前延迟的最大随机抖动（秒）
    pub jitter_seconds: f64,
}

impl ProtectionSettings {
    pub fn jitter(&self) -> Duration {
        if self.jitter_seconds.is_finite() && self.jitter_seconds > 0.0 {
            Duration::from_secs_f64(self.jitter_seconds)
        } else {
            Duration::ZERO
        }
    }
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 输出格式 (pretty, json)
    pub format: String,
}

impl LoggingSettings {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、配置文件（`STATSRS_CONFIG` 或 `config/default`）
    /// 和 `STATSRS__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Self::defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix("STATSRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 从指定文件加载配置，不读取环境变量
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let http = HttpSettings::default();
        Config::builder()
            // Scheduler
            .set_default("scheduler.interval_hours", 24.0)?
            .set_default("scheduler.max_concurrency", 5)?
            // Storage
            .set_default("storage.output_dir", "./stats")?
            // HTTP client
            .set_default("http.user_agent", http.user_agent)?
            .set_default("http.pool_idle_timeout_seconds", http.pool_idle_timeout_seconds)?
            // Protection
            .set_default("protection.jitter_seconds", 0.0)?
            // Logging
            .set_default("logging.format", "pretty")?
            // Metrics
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

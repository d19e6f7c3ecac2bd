// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::utils::errors::SiteConfigError;

static CONTAINS_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^:]*:contains\(\s*["']?([^"')]+?)["']?\s*\)$"#).expect("valid regex")
});

static ATTRIBUTE_SHORTHAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([A-Za-z_][\w\-:]*)\]$").expect("valid regex"));

/// 选择器类型
///
/// 每种类型携带自己的匹配模式，由提取服务中的解释器按顺序求值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSelector", into = "RawSelector")]
pub enum SelectorKind {
    /// CSS 选择器，取元素文本中的数字
    Css(String),
    /// 属性名，取带有该属性的元素的属性值
    Attribute(String),
    /// 文本片段，取包含该文本的节点的父元素文本中的数字
    TextContains(String),
}

impl SelectorKind {
    /// 解析简写形式的选择器字符串
    ///
    /// * `h1:contains('servers')` -> `TextContains("servers")`
    /// * `[data-count]` -> `Attribute("data-count")`
    /// * 其他 -> `Css`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(caps) = CONTAINS_SHORTHAND.captures(raw) {
            return SelectorKind::TextContains(caps[1].trim().to_string());
        }
        if let Some(caps) = ATTRIBUTE_SHORTHAND.captures(raw) {
            return SelectorKind::Attribute(caps[1].to_string());
        }
        SelectorKind::Css(raw.to_string())
    }

    /// 选择器模式
    pub fn pattern(&self) -> &str {
        match self {
            SelectorKind::Css(p) | SelectorKind::Attribute(p) | SelectorKind::TextContains(p) => p,
        }
    }
}

impl std::fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorKind::Css(p) => write!(f, "css({})", p),
            SelectorKind::Attribute(p) => write!(f, "attribute({})", p),
            SelectorKind::TextContains(p) => write!(f, "text_contains({})", p),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SelectorTag {
    Css,
    Attribute,
    TextContains,
}

/// 配置文件中的选择器表示：简写字符串或 `{ kind, pattern }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Shorthand(String),
    Tagged { kind: SelectorTag, pattern: String },
}

impl From<RawSelector> for SelectorKind {
    fn from(raw: RawSelector) -> Self {
        match raw {
            RawSelector::Shorthand(s) => SelectorKind::parse(&s),
            RawSelector::Tagged { kind, pattern } => match kind {
                SelectorTag::Css => SelectorKind::Css(pattern),
                SelectorTag::Attribute => SelectorKind::Attribute(pattern),
                SelectorTag::TextContains => SelectorKind::TextContains(pattern),
            },
        }
    }
}

impl From<SelectorKind> for RawSelector {
    fn from(selector: SelectorKind) -> Self {
        match selector {
            SelectorKind::Css(pattern) => RawSelector::Tagged {
                kind: SelectorTag::Css,
                pattern,
            },
            SelectorKind::Attribute(pattern) => RawSelector::Tagged {
                kind: SelectorTag::Attribute,
                pattern,
            },
            SelectorKind::TextContains(pattern) => RawSelector::Tagged {
                kind: SelectorTag::TextContains,
                pattern,
            },
        }
    }
}

/// 防护模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionMode {
    /// 普通站点，只请求一次
    #[default]
    None,
    /// 有反爬防护的站点，需要延迟、重试和浏览器请求头
    #[serde(alias = "rate-limited", alias = "cloudflare")]
    RateLimited,
}

/// 一个选择器匹配到多个数值时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisambiguationPolicy {
    /// 取文档顺序中的第一个
    #[default]
    First,
    /// 所有候选值必须一致，否则视为歧义
    Unique,
    /// 取最大值
    Max,
}

/// 站点描述
///
/// 描述一个需要统计服务器数量的目标站点，进程内只读
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SiteSpec {
    /// 站点名称（配置内唯一）
    #[validate(length(min = 1, message = "site name cannot be empty"))]
    pub name: String,
    /// 目标URL
    #[validate(url)]
    pub url: String,
    /// 主选择器
    pub primary_selector: SelectorKind,
    /// 备用选择器，按顺序尝试
    #[serde(default)]
    pub fallback_selectors: Vec<SelectorKind>,
    /// 超时时间（秒）
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(exclusive_min = 0.0, max = 600.0))]
    pub timeout_seconds: f64,
    /// 附加请求头，覆盖默认请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 防护模式
    #[serde(default)]
    pub protection_mode: ProtectionMode,
    /// 每次请求前的等待时间（秒），仅对防护站点生效
    #[serde(default)]
    #[validate(range(min = 0.0, max = 3600.0))]
    pub request_delay_seconds: f64,
    /// 最大重试次数，仅对防护站点生效
    #[serde(default)]
    #[validate(range(max = 20))]
    pub max_retries: u32,
    /// Referer 请求头
    #[serde(default)]
    pub referer: Option<String>,
    /// 固定 User-Agent，未设置时防护站点随机选择
    #[serde(default)]
    pub user_agent: Option<String>,
    /// 多值匹配策略
    #[serde(default)]
    pub disambiguation: DisambiguationPolicy,
}

fn default_timeout_seconds() -> f64 {
    30.0
}

impl SiteSpec {
    /// 使用默认参数创建站点描述
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        primary_selector: SelectorKind,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            primary_selector,
            fallback_selectors: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
            headers: HashMap::new(),
            protection_mode: ProtectionMode::None,
            request_delay_seconds: 0.0,
            max_retries: 0,
            referer: None,
            user_agent: None,
            disambiguation: DisambiguationPolicy::First,
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<SelectorKind>) -> Self {
        self.fallback_selectors = fallbacks;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 设置为防护站点
    pub fn rate_limited(mut self, request_delay_seconds: f64, max_retries: u32) -> Self {
        self.protection_mode = ProtectionMode::RateLimited;
        self.request_delay_seconds = request_delay_seconds;
        self.max_retries = max_retries;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_disambiguation(mut self, policy: DisambiguationPolicy) -> Self {
        self.disambiguation = policy;
        self
    }

    /// 按尝试顺序返回所有选择器
    pub fn selectors(&self) -> impl Iterator<Item = &SelectorKind> {
        std::iter::once(&self.primary_selector).chain(self.fallback_selectors.iter())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay_seconds.max(0.0))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.protection_mode == ProtectionMode::RateLimited
    }

    /// 一次 fetch 最多发起的请求数
    pub fn max_attempts(&self) -> u32 {
        match self.protection_mode {
            ProtectionMode::None => 1,
            ProtectionMode::RateLimited => self.max_retries.saturating_add(1),
        }
    }
}

/// 校验站点列表
///
/// 逐个校验字段范围，并保证站点名称唯一
pub fn validate_sites(sites: &[SiteSpec]) -> Result<(), SiteConfigError> {
    let mut seen = HashSet::new();
    for site in sites {
        site.validate().map_err(|e| SiteConfigError::Invalid {
            site: site.name.clone(),
            reason: e.to_string(),
        })?;
        let scheme = Url::parse(&site.url).map(|u| u.scheme().to_string()).unwrap_or_default();
        if scheme != "http" && scheme != "https" {
            return Err(SiteConfigError::Invalid {
                site: site.name.clone(),
                reason: format!("unsupported url scheme: {}", site.url),
            });
        }
        if !seen.insert(site.name.as_str()) {
            return Err(SiteConfigError::DuplicateName(site.name.clone()));
        }
    }
    Ok(())
}

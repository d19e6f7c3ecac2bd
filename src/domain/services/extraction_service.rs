// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::{DisambiguationPolicy, SelectorKind, SiteSpec};

/// 可能带千位分隔符的数字
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:[,'_\u{00A0}\u{202F}][0-9]{3})*").expect("valid regex"));

/// "Showing 1-30 of 1158 servers" 这类分页文本
static OF_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bof\b").expect("valid regex"));

/// CSS 匹配的元素文本中没有数字时尝试的属性
const COUNT_ATTRIBUTES: &[&str] = &["data-count", "data-total", "data-servers"];

/// 提取错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// 没有任何选择器得到数字
    #[error("no selector matched a numeric value")]
    NoMatch,
    /// 至少一个选择器匹配到互相矛盾的多个数值
    #[error("selector {selector} matched conflicting values {values:?}")]
    Ambiguous { selector: String, values: Vec<u64> },
}

enum Resolution {
    Value(u64),
    Empty,
    Ambiguous(Vec<u64>),
}

/// 提取服务
///
/// 按 主选择器 -> 备用选择器 的顺序解释 [`SelectorKind`]，第一个得到
/// 无歧义数值的选择器胜出。纯函数，不访问网络和文件系统。
pub struct ExtractionService;

impl ExtractionService {
    /// 从页面中提取服务器数量
    pub fn extract(html_content: &str, site: &SiteSpec) -> Result<u64, ExtractError> {
        let document = Html::parse_document(html_content);
        let mut first_ambiguity: Option<ExtractError> = None;

        for selector in site.selectors() {
            let candidates = Self::candidates(&document, selector);

            match Self::resolve(&candidates, site.disambiguation) {
                Resolution::Value(value) => {
                    debug!(site = %site.name, %selector, value, "selector matched");
                    return Ok(value);
                }
                Resolution::Empty => {
                    debug!(site = %site.name, %selector, "selector matched nothing");
                }
                Resolution::Ambiguous(values) => {
                    debug!(site = %site.name, %selector, ?values, "selector is ambiguous, falling through");
                    if first_ambiguity.is_none() {
                        first_ambiguity = Some(ExtractError::Ambiguous {
                            selector: selector.to_string(),
                            values,
                        });
                    }
                }
            }
        }

        Err(first_ambiguity.unwrap_or(ExtractError::NoMatch))
    }

    /// 计算一个选择器的全部候选数值（文档顺序）
    fn candidates(document: &Html, selector: &SelectorKind) -> Vec<u64> {
        match selector {
            SelectorKind::Css(pattern) => {
                let Some(css) = Self::parse_css(pattern) else {
                    return Vec::new();
                };
                document
                    .select(&css)
                    .filter_map(|element| {
                        let text: String = element.text().collect();
                        number_from_text(&text).or_else(|| {
                            COUNT_ATTRIBUTES
                                .iter()
                                .filter_map(|attr| element.value().attr(attr))
                                .find_map(number_from_text)
                        })
                    })
                    .collect()
            }
            SelectorKind::Attribute(name) => {
                let Some(css) = Self::parse_css(&format!("[{}]", name)) else {
                    return Vec::new();
                };
                document
                    .select(&css)
                    .filter_map(|element| element.value().attr(name))
                    .filter_map(number_from_text)
                    .collect()
            }
            SelectorKind::TextContains(needle) => {
                let needle = needle.to_lowercase();
                let mut seen = HashSet::new();
                let mut values = Vec::new();

                for node in document.root_element().descendants() {
                    let Some(text) = node.value().as_text() else {
                        continue;
                    };
                    if !text.to_lowercase().contains(&needle) {
                        continue;
                    }
                    let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                        continue;
                    };
                    if matches!(parent.value().name(), "script" | "style") {
                        continue;
                    }
                    if !seen.insert(parent.id()) {
                        continue;
                    }
                    let parent_text: String = parent.text().collect();
                    if let Some(value) = number_from_text(&parent_text) {
                        values.push(value);
                    }
                }

                values
            }
        }
    }

    fn parse_css(pattern: &str) -> Option<Selector> {
        match Selector::parse(pattern) {
            Ok(selector) => Some(selector),
            Err(e) => {
                debug!(pattern, "invalid css selector: {:?}", e);
                None
            }
        }
    }

    fn resolve(candidates: &[u64], policy: DisambiguationPolicy) -> Resolution {
        let Some(&first) = candidates.first() else {
            return Resolution::Empty;
        };

        match policy {
            DisambiguationPolicy::First => Resolution::Value(first),
            DisambiguationPolicy::Max => {
                Resolution::Value(candidates.iter().copied().max().unwrap_or(first))
            }
            DisambiguationPolicy::Unique => {
                if candidates.iter().all(|v| *v == first) {
                    Resolution::Value(first)
                } else {
                    Resolution::Ambiguous(candidates.to_vec())
                }
            }
        }
    }
}

/// 从文本中解析数量
///
/// 去掉数字之间的千位分隔符后取数字；文本包含 "of" 且有多个数字时取最后一个
/// （分页文本中的总数），否则取第一个。
pub fn number_from_text(text: &str) -> Option<u64> {
    let numbers: Vec<u64> = NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect();

    if numbers.len() > 1 && OF_TOTAL.is_match(text) {
        return numbers.last().copied();
    }
    numbers.first().copied()
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;

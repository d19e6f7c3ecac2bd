// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::seq::IndexedRandom;
use std::collections::HashMap;

use crate::domain::models::SiteSpec;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; statsrs/1.0; +https://github.com/Kirky-X)";

const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

// Any one of these on its own identifies a challenge page.
const STRONG_MARKERS: &[&str] = &[
    "checking your browser",
    "cf-chl",
    "_cf_chl_opt",
    "ddos protection by",
    "attention required! | cloudflare",
    "verify you are human",
];

// Vendors inject these scripts into ordinary pages too, so they only count on a blocking status.
const BLOCKING_STATUS_MARKERS: &[&str] = &["challenge-platform"];

// These only count together with a vendor name.
const WEAK_MARKERS: &[&str] = &["ray id", "please wait", "security check", "just a moment"];

const VENDOR_MARKERS: &[&str] = &["cloudflare", "ddos-guard", "sucuri", "akamai"];

/// 普通站点的默认请求头
pub fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
    ])
}

/// 防护站点使用的浏览器请求头
pub fn browser_headers(user_agent: Option<&str>) -> HashMap<String, String> {
    let user_agent = match user_agent {
        Some(ua) => ua.to_string(),
        None => BROWSER_USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(BROWSER_USER_AGENTS[0])
            .to_string(),
    };

    HashMap::from([
        ("User-Agent".to_string(), user_agent),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ("Sec-Fetch-Dest".to_string(), "document".to_string()),
        ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
        ("Sec-Fetch-Site".to_string(), "none".to_string()),
        ("Cache-Control".to_string(), "max-age=0".to_string()),
    ])
}

/// 构建站点请求头
///
/// 站点自定义请求头覆盖默认值（名称不区分大小写），防护站点额外带上 Referer
pub fn build_headers(site: &SiteSpec) -> HashMap<String, String> {
    let mut headers = if site.is_rate_limited() {
        browser_headers(site.user_agent.as_deref())
    } else {
        let mut headers = default_headers();
        if let Some(ua) = &site.user_agent {
            headers.insert("User-Agent".to_string(), ua.clone());
        }
        headers
    };

    if site.is_rate_limited() {
        if let Some(referer) = &site.referer {
            merge_header(&mut headers, "Referer", referer);
        }
    }

    for (name, value) in &site.headers {
        merge_header(&mut headers, name, value);
    }

    headers
}

fn merge_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

/// 检测反爬挑战页
///
/// 返回命中的标记，未命中返回 `None`
pub fn detect_challenge(status_code: u16, body: &str) -> Option<String> {
    let suspicious_status = matches!(status_code, 403 | 429 | 503);
    let success = (200..300).contains(&status_code);
    if !suspicious_status && !success {
        return None;
    }

    let lower = body.to_lowercase();

    if let Some(marker) = STRONG_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Some(marker.to_string());
    }

    if suspicious_status {
        if let Some(marker) = BLOCKING_STATUS_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Some(marker.to_string());
        }
    }

    let vendor = VENDOR_MARKERS.iter().find(|m| lower.contains(*m))?;
    if let Some(marker) = WEAK_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Some(format!("{} {}", vendor, marker));
    }

    // A bare vendor name in an error body is enough; in a normal page it is not.
    if suspicious_status {
        return Some(vendor.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SelectorKind;

    #[test]
    fn test_detect_challenge_pages() {
        let cf = "<html><title>Just a moment...</title><body>Checking your browser before accessing. Ray ID: 123</body></html>";
        assert!(detect_challenge(200, cf).is_some());
        assert!(detect_challenge(503, cf).is_some());
        assert!(detect_challenge(403, "<p>Sorry, you have been blocked</p><p>Cloudflare</p>").is_some());
        assert!(detect_challenge(200, "<p>Performance &amp; security by Cloudflare. Ray ID: 7f</p>").is_some());
    }

    #[test]
    fn test_detect_challenge_ignores_normal_pages() {
        assert!(detect_challenge(200, "<div class='count'>1,234 servers</div>").is_none());
        // Mentioning the vendor in a normal page is not a challenge.
        assert!(detect_challenge(200, "<p>Hosted behind Cloudflare</p>").is_none());
        assert!(detect_challenge(429, "Too many requests").is_none());
        assert!(detect_challenge(500, "checking your browser").is_none());
    }

    #[test]
    fn test_challenge_script_on_normal_page_is_not_a_challenge() {
        let page = "<html><body><span class='count'>1,234</span>\
            <script>(function(){var s=document.createElement('script');\
            s.src='/cdn-cgi/challenge-platform/scripts/jsd/main.js';})();</script></body></html>";

        assert_eq!(detect_challenge(200, page), None);
        assert_eq!(
            detect_challenge(503, page).as_deref(),
            Some("challenge-platform")
        );
        assert_eq!(
            detect_challenge(200, "<script>window._cf_chl_opt={cvId:'3'};</script>").as_deref(),
            Some("_cf_chl_opt")
        );
    }

    #[test]
    fn test_build_headers_merges_site_headers() {
        let site = SiteSpec::new("a", "https://a.example", SelectorKind::parse(".n"))
            .with_header("user-agent", "custom/1.0")
            .with_header("X-Token", "abc");
        let headers = build_headers(&site);

        assert_eq!(headers.get("user-agent").map(String::as_str), Some("custom/1.0"));
        assert!(!headers.contains_key("User-Agent"));
        assert_eq!(headers.get("X-Token").map(String::as_str), Some("abc"));
        assert!(headers.contains_key("Accept"));
        assert!(!headers.contains_key("Referer"));
    }

    #[test]
    fn test_build_headers_for_protected_site() {
        let site = SiteSpec::new("a", "https://a.example", SelectorKind::parse(".n"))
            .rate_limited(5.0, 2)
            .with_referer("https://www.google.com/");
        let headers = build_headers(&site);

        assert_eq!(
            headers.get("Referer").map(String::as_str),
            Some("https://www.google.com/")
        );
        assert_eq!(headers.get("Sec-Fetch-Mode").map(String::as_str), Some("navigate"));
        let ua = headers.get("User-Agent").unwrap();
        assert!(BROWSER_USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn test_referer_ignored_for_unprotected_site() {
        let site = SiteSpec::new("a", "https://a.example", SelectorKind::parse(".n"))
            .with_referer("https://www.google.com/");
        assert!(!build_headers(&site).contains_key("Referer"));
    }
}

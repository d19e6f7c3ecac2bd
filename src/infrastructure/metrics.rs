// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 初始化指标系统
///
/// 启用时安装 Prometheus 导出器并注册各项指标的描述；
/// 地址无效或端口被占用时只记录警告，不影响统计运行
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "stats_site_crawls_total",
        "Total number of site crawls, labelled by site and status"
    );
    describe_histogram!(
        "stats_site_crawl_duration_seconds",
        "Duration of a single site crawl (fetch and extract) in seconds"
    );
    describe_counter!(
        "stats_ticks_total",
        "Total number of scheduler ticks, labelled by outcome"
    );
    describe_gauge!(
        "stats_total_servers",
        "Total server count of the most recent successful run"
    );
    describe_gauge!(
        "stats_sites_succeeded",
        "Number of sites that succeeded in the most recent run"
    );
}

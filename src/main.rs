// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use clap::Parser;
use statsrs::cli::{Cli, Command};
use statsrs::config::settings::Settings;
use statsrs::config::site_source::{FileSiteSource, SettingsSiteSource, SiteSource};
use statsrs::domain::repositories::stats_repository::StatsRepository;
use statsrs::domain::services::crawl_service::SiteCrawler;
use statsrs::domain::services::stats_run_service::StatsRunCoordinator;
use statsrs::engines::reqwest_engine::ReqwestEngine;
use statsrs::engines::site_fetcher::SiteFetcher;
use statsrs::infrastructure::metrics::init_metrics;
use statsrs::infrastructure::storage::FileStatsStore;
use statsrs::utils::telemetry;
use statsrs::workers::{StatsScheduler, Worker};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并执行子命令
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.logging);
    info!("Starting statsrs...");
    init_metrics(&settings.metrics);

    // 3. Initialize components
    let store = Arc::new(FileStatsStore::from_settings(&settings.storage));
    let engine = Arc::new(ReqwestEngine::new(&settings.http)?);
    let fetcher = SiteFetcher::new(engine).with_jitter(settings.protection.jitter());
    let coordinator = Arc::new(
        StatsRunCoordinator::new(SiteCrawler::new(fetcher), store.clone())
            .with_max_concurrency(settings.scheduler.max_concurrency),
    );
    let source: Arc<dyn SiteSource> = match &settings.sites_file {
        Some(path) => Arc::new(FileSiteSource::new(path.clone())),
        None => Arc::new(SettingsSiteSource),
    };
    let scheduler = StatsScheduler::new(coordinator, source, settings.scheduler.interval_hours)?;
    info!(output_dir = %store.base_path().display(), "Components initialized");

    match cli.command() {
        Command::Run => {
            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutdown signal received, finishing current tick");
                        signal_token.cancel();
                    }
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
            });

            info!("Running {}", scheduler.name());
            scheduler.run(shutdown).await;
        }
        Command::Once => {
            let snapshot = scheduler.run_once().await?;
            println!(
                "{} of {} sites succeeded, {} servers in total",
                snapshot.success_count, snapshot.total_count, snapshot.total_servers
            );
        }
        Command::Latest => match store.read_latest().await? {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("no stats recorded yet"),
        },
        Command::History { limit } => {
            for row in store.read_history(Some(limit)).await? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
    }

    Ok(())
}

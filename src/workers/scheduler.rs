// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::site_source::SiteSource;
use crate::domain::models::RunSnapshot;
use crate::domain::repositories::stats_repository::StatsRepository;
use crate::domain::services::stats_run_service::StatsRunCoordinator;
use crate::engines::traits::PageEngine;
use crate::utils::errors::{panic_message, SchedulerError, TickError};
use crate::workers::worker::Worker;

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    RunningTick,
    Sleeping,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::RunningTick => "running_tick",
            SchedulerState::Sleeping => "sleeping",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// 一次 tick 的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Succeeded {
        success_count: usize,
        total_count: usize,
        total_servers: u64,
    },
    Failed {
        error: String,
    },
}

/// tick 报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: TickOutcome,
}

/// 调度器状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub interval_hours: f64,
    /// 下一次 tick 的预计开始时间，仅在 Sleeping 状态下存在
    pub next_run: Option<DateTime<Utc>>,
    pub ticks_completed: u64,
    pub ticks_failed: u64,
    pub last_tick: Option<TickReport>,
}

/// 统计调度器
///
/// 启动后立即执行一次 tick，之后在 `tick_start + interval` 执行下一次。
/// tick 超时时下一次在完成后立即开始，tick 之间从不重叠也不排队。
/// 失败的 tick 只记录日志，不会终止调度。
pub struct StatsScheduler<E: PageEngine + ?Sized, R: StatsRepository + ?Sized> {
    coordinator: Arc<StatsRunCoordinator<E, R>>,
    source: Arc<dyn SiteSource>,
    interval: Duration,
    status: RwLock<SchedulerStatus>,
}

impl<E: PageEngine + ?Sized, R: StatsRepository + ?Sized> StatsScheduler<E, R> {
    /// 创建调度器
    ///
    /// `interval_hours` 必须是大于零的有限值
    pub fn new(
        coordinator: Arc<StatsRunCoordinator<E, R>>,
        source: Arc<dyn SiteSource>,
        interval_hours: f64,
    ) -> Result<Self, SchedulerError> {
        if !interval_hours.is_finite() || interval_hours <= 0.0 {
            return Err(SchedulerError::InvalidInterval(interval_hours));
        }
        let interval = Duration::try_from_secs_f64(interval_hours * 3600.0)
            .map_err(|_| SchedulerError::InvalidInterval(interval_hours))?;

        Ok(Self {
            coordinator,
            source,
            interval,
            status: RwLock::new(SchedulerStatus {
                state: SchedulerState::Idle,
                interval_hours,
                next_run: None,
                ticks_completed: 0,
                ticks_failed: 0,
                last_tick: None,
            }),
        })
    }

    /// 当前状态快照
    pub fn status(&self) -> SchedulerStatus {
        self.status.read().clone()
    }

    /// 在调度循环之外执行一次 tick
    pub async fn run_once(&self) -> Result<RunSnapshot, TickError> {
        let result = self.tick().await;
        self.status.write().state = SchedulerState::Idle;
        result
    }

    /// 执行调度循环，直到 `shutdown` 被取消
    ///
    /// 取消只在 tick 边界和等待期间生效，进行中的 tick 会完整执行
    pub async fn run_until_cancelled(&self, shutdown: CancellationToken) {
        info!(interval_hours = self.status.read().interval_hours, "stats scheduler started");

        while !shutdown.is_cancelled() {
            let tick_start = Instant::now();
            // Failures are logged and recorded in the status by `tick`.
            let _ = self.tick().await;

            if shutdown.is_cancelled() {
                break;
            }

            let next = tick_start + self.interval;
            let wait = next.saturating_duration_since(Instant::now());
            {
                let mut status = self.status.write();
                status.state = SchedulerState::Sleeping;
                status.next_run = Some(
                    Utc::now() + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero()),
                );
            }
            info!(wait_secs = wait.as_secs(), "next stats run scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep_until(next) => {}
            }
        }

        {
            let mut status = self.status.write();
            status.state = SchedulerState::Stopped;
            status.next_run = None;
        }
        info!("stats scheduler stopped");
    }

    async fn tick(&self) -> Result<RunSnapshot, TickError> {
        let started_at = Utc::now();
        {
            let mut status = self.status.write();
            status.state = SchedulerState::RunningTick;
            status.next_run = None;
        }

        let result = AssertUnwindSafe(self.execute())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TickError::Panicked(panic_message(payload.as_ref()))));

        let outcome = match &result {
            Ok(snapshot) => {
                info!(
                    success = snapshot.success_count,
                    total = snapshot.total_count,
                    total_servers = snapshot.total_servers,
                    "stats tick completed"
                );
                metrics::gauge!("stats_total_servers").set(snapshot.total_servers as f64);
                metrics::gauge!("stats_sites_succeeded").set(snapshot.success_count as f64);
                TickOutcome::Succeeded {
                    success_count: snapshot.success_count,
                    total_count: snapshot.total_count,
                    total_servers: snapshot.total_servers,
                }
            }
            Err(e) => {
                error!("stats tick failed: {}", e);
                TickOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let label = match outcome {
            TickOutcome::Succeeded { .. } => "succeeded",
            TickOutcome::Failed { .. } => "failed",
        };
        metrics::counter!("stats_ticks_total", "outcome" => label).increment(1);

        let mut status = self.status.write();
        match outcome {
            TickOutcome::Succeeded { .. } => status.ticks_completed += 1,
            TickOutcome::Failed { .. } => status.ticks_failed += 1,
        }
        status.last_tick = Some(TickReport {
            started_at,
            finished_at: Utc::now(),
            outcome,
        });
        drop(status);

        result
    }

    async fn execute(&self) -> Result<RunSnapshot, TickError> {
        let sites = self.source.load_sites().await?;
        Ok(self.coordinator.run(&sites).await?)
    }
}

#[async_trait]
impl<E, R> Worker for StatsScheduler<E, R>
where
    E: PageEngine + ?Sized + 'static,
    R: StatsRepository + ?Sized + 'static,
{
    async fn run(&self, shutdown: CancellationToken) {
        self.run_until_cancelled(shutdown).await;
    }

    fn name(&self) -> &str {
        "stats_scheduler"
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;

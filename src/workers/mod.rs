// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台调度和工作器生命周期管理
pub mod scheduler;
pub mod worker;

pub use scheduler::{SchedulerState, SchedulerStatus, StatsScheduler, TickOutcome, TickReport};
pub use worker::Worker;

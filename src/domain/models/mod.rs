// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心数据结构，包括：
/// - 站点描述（site_spec）：目标站点、选择器和防护参数
/// - 站点结果（site_result）：单个站点一次爬取的结果，也是历史记录的一行
/// - 运行快照（run_snapshot）：一次调度运行的全部结果和汇总
pub mod run_snapshot;
pub mod site_result;
pub mod site_spec;

pub use run_snapshot::RunSnapshot;
pub use site_result::{SiteResult, SiteStatus};
pub use site_spec::{DisambiguationPolicy, ProtectionMode, SelectorKind, SiteSpec};

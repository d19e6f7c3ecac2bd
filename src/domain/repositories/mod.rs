// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义领域层的仓库接口，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 统计仓库（stats_repository）：运行快照和站点历史记录的存储
pub mod stats_repository;

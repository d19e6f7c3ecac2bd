// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：站点描述、站点结果和运行快照
/// - 仓库接口（repositories）：统计结果持久化抽象接口
/// - 服务（services）：提取、单站点爬取和整次运行协调
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;

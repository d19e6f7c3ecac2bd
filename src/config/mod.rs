// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置，包括调度、存储、HTTP 客户端等配置
pub mod settings;

/// 站点列表来源
pub mod site_source;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 命令行参数
pub mod cli;

/// 配置模块
///
/// 处理应用程序的配置设置、环境变量和站点列表
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 实现页面抓取引擎和站点级抓取协议
pub mod engines;

/// 基础设施模块
///
/// 提供文件存储和指标导出
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现定时调度
pub mod workers;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 提取服务（extraction_service）：按选择器从页面中解析服务器数量
/// - 爬取服务（crawl_service）：对单个站点执行抓取和提取，产出站点结果
/// - 统计运行服务（stats_run_service）：并发爬取所有站点并持久化快照
pub mod crawl_service;
pub mod extraction_service;
pub mod stats_run_service;

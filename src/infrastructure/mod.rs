// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，依赖于领域层的抽象接口。
///
/// 包含的子模块：
/// - 指标（metrics）：Prometheus 导出器和指标描述
/// - 存储（storage）：统计结果的文件存储和内存存储
pub mod metrics;
pub mod storage;

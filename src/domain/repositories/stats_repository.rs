// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{RunSnapshot, SiteResult};

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 存储错误
    #[error("Storage error: {0}")]
    Other(String),
}

/// 统计结果仓库特质
///
/// 定义运行快照和历史记录的持久化接口
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// 持久化一次运行：覆盖最新快照、写入带时间戳的快照、追加历史记录
    async fn write(&self, snapshot: &RunSnapshot) -> Result<(), StorageError>;

    /// 读取最新快照，不存在时返回 `None`
    async fn read_latest(&self) -> Result<Option<RunSnapshot>, StorageError>;

    /// 读取历史记录，最新的在前；`limit` 为 `None` 时返回全部
    async fn read_history(&self, limit: Option<usize>) -> Result<Vec<SiteResult>, StorageError>;
}

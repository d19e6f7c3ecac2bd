// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::config::settings::StorageSettings;
use crate::domain::models::{RunSnapshot, SiteResult};
use crate::domain::repositories::stats_repository::{StatsRepository, StorageError};

/// 最新快照文件
pub const LATEST_FILE: &str = "latest_stats.json";
/// 历史记录文件，每行一个站点结果
pub const HISTORY_FILE: &str = "stats_history.jsonl";
/// 带时间戳的快照目录
pub const SNAPSHOT_DIR: &str = "snapshots";

/// 反向读取历史文件时每次读取的字节数
const TAIL_BLOCK_SIZE: u64 = 8 * 1024;

/// 本地文件系统统计存储
///
/// 目录结构：
///
/// ```text
/// <output_dir>/
///   latest_stats.json
///   stats_history.jsonl
///   snapshots/stats_YYYYMMDD_HHMMSS.json
/// ```
///
/// 快照文件通过 临时文件 + fsync + rename 写入，读者只会看到旧文档或新文档。
pub struct FileStatsStore {
    base_path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStatsStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.output_dir.clone())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn latest_path(&self) -> PathBuf {
        self.base_path.join(LATEST_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_path.join(HISTORY_FILE)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.base_path.join(SNAPSHOT_DIR)
    }

    /// 为快照选择不存在的文件名，同一秒内的多次运行追加数字后缀
    async fn snapshot_path(&self, generated_at: DateTime<Utc>) -> Result<PathBuf, StorageError> {
        let dir = self.snapshot_dir();
        let stem = format!("stats_{}", generated_at.format("%Y%m%d_%H%M%S"));

        let mut candidate = dir.join(format!("{}.json", stem));
        let mut suffix = 1u32;
        while fs::try_exists(&candidate).await? {
            candidate = dir.join(format!("{}_{}.json", stem, suffix));
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn append_history(&self, snapshot: &RunSnapshot) -> Result<(), StorageError> {
        if snapshot.sites.is_empty() {
            return Ok(());
        }

        let mut rows: Vec<&SiteResult> = snapshot.sites.iter().collect();
        rows.sort_by_key(|row| row.crawled_at);

        let path = self.history_path();
        let mut buf = Vec::new();
        // A previous torn write must not swallow the first new row.
        if !ends_with_newline(&path).await? {
            buf.push(b'\n');
        }
        for row in rows {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn read_history_all(&self) -> Result<Vec<SiteResult>, StorageError> {
        let file = match fs::File::open(self.history_path()).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut rows = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SiteResult>(&line) {
                Ok(row) => rows.push(row),
                Err(e) => warn!("skipping malformed history line: {}", e),
            }
        }

        rows.reverse();
        Ok(rows)
    }

    /// 从文件末尾按块向前读取，直到得到 `limit` 行完整记录
    async fn read_history_tail(&self, limit: usize) -> Result<Vec<SiteResult>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut file = match fs::File::open(self.history_path()).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut pos = file.metadata().await?.len();
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let newlines = buf.iter().filter(|b| **b == b'\n').count();
            if pos > 0 && newlines <= limit {
                pos = prepend_block(&mut file, pos, &mut buf).await?;
                continue;
            }

            let (rows, skipped) = parse_tail(&buf, pos > 0, limit);
            if rows.len() >= limit || pos == 0 {
                if skipped > 0 {
                    warn!(skipped, "skipped malformed history lines");
                }
                debug!(rows = rows.len(), bytes_read = buf.len(), "read history tail");
                return Ok(rows);
            }
            pos = prepend_block(&mut file, pos, &mut buf).await?;
        }
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| StorageError::Other(format!("invalid path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::Io(e));
    }
    Ok(())
}

async fn ends_with_newline(path: &Path) -> Result<bool, StorageError> {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(StorageError::Io(e)),
    };
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

/// 把 `pos` 之前的一块读到 `buf` 前面，返回新的位置
async fn prepend_block(file: &mut fs::File, pos: u64, buf: &mut Vec<u8>) -> Result<u64, StorageError> {
    let size = TAIL_BLOCK_SIZE.min(pos);
    let start = pos - size;

    file.seek(SeekFrom::Start(start)).await?;
    let mut block = vec![0u8; size as usize];
    file.read_exact(&mut block).await?;

    block.extend_from_slice(buf);
    *buf = block;
    Ok(start)
}

/// 解析尾部缓冲区，返回（最新在前的记录，跳过的行数）
///
/// `partial_head` 为真时第一段可能是被截断的行，直接丢弃
fn parse_tail(buf: &[u8], partial_head: bool, limit: usize) -> (Vec<SiteResult>, usize) {
    let text = String::from_utf8_lossy(buf);
    let mut lines = text.split('\n');
    if partial_head {
        lines.next();
    }

    let lines: Vec<&str> = lines.collect();
    let mut rows = Vec::new();
    let mut skipped = 0;
    for line in lines.iter().rev() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SiteResult>(line) {
            Ok(row) => {
                rows.push(row);
                if rows.len() == limit {
                    break;
                }
            }
            Err(_) => skipped += 1,
        }
    }
    (rows, skipped)
}

#[async_trait]
impl StatsRepository for FileStatsStore {
    async fn write(&self, snapshot: &RunSnapshot) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(self.snapshot_dir()).await?;
        let document = serde_json::to_vec_pretty(snapshot)?;

        write_atomic(&self.latest_path(), &document).await?;

        let snapshot_path = self.snapshot_path(snapshot.generated_at).await?;
        write_atomic(&snapshot_path, &document).await?;

        self.append_history(snapshot).await?;

        debug!(
            latest = %self.latest_path().display(),
            snapshot = %snapshot_path.display(),
            rows = snapshot.sites.len(),
            "run snapshot persisted"
        );
        Ok(())
    }

    async fn read_latest(&self) -> Result<Option<RunSnapshot>, StorageError> {
        match fs::read(self.latest_path()).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn read_history(&self, limit: Option<usize>) -> Result<Vec<SiteResult>, StorageError> {
        match limit {
            Some(limit) => self.read_history_tail(limit).await,
            None => self.read_history_all().await,
        }
    }
}

#[derive(Default)]
struct MemoryState {
    latest: Option<RunSnapshot>,
    history: Vec<SiteResult>,
    writes: usize,
}

/// 内存统计存储，用于测试和试运行
#[derive(Default)]
pub struct InMemoryStatsStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已调用 `write` 的次数
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsStore {
    async fn write(&self, snapshot: &RunSnapshot) -> Result<(), StorageError> {
        let mut rows = snapshot.sites.clone();
        rows.sort_by_key(|row| row.crawled_at);

        let mut state = self.state.lock();
        state.latest = Some(snapshot.clone());
        state.history.extend(rows);
        state.writes += 1;
        Ok(())
    }

    async fn read_latest(&self) -> Result<Option<RunSnapshot>, StorageError> {
        Ok(self.state.lock().latest.clone())
    }

    async fn read_history(&self, limit: Option<usize>) -> Result<Vec<SiteResult>, StorageError> {
        let state = self.state.lock();
        let rows = state.history.iter().rev().cloned();
        Ok(match limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

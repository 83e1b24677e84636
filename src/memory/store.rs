//! 记忆存储能力
//!
//! 日志（logs.jsonl，只追加）与滚动摘要（summary.json，整体替换）抽象为 MemoryStore，
//! 文件实现用于生产，内存实现用于测试与并发交错模拟。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::core::AgentError;

/// 日志文件名
pub const LOGS_FILE: &str = "logs.jsonl";
/// 摘要文件名
pub const SUMMARY_FILE: &str = "summary.json";

/// 记忆存储 trait：append / read / replace
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// 追加一行（不含换行符）；单行写入是原子的
    async fn append_log_line(&self, line: &str) -> Result<(), AgentError>;

    /// 按写入顺序返回全部日志行；日志不存在时返回空
    async fn read_log_lines(&self) -> Result<Vec<String>, AgentError>;

    /// 读取摘要原文；不存在时返回 None
    async fn read_summary(&self) -> Result<Option<String>, AgentError>;

    /// 整体替换摘要
    async fn replace_summary(&self, content: &str) -> Result<(), AgentError>;
}

/// 文件存储：<dir>/logs.jsonl + <dir>/summary.json
#[derive(Debug)]
pub struct FileMemoryStore {
    dir: PathBuf,
    append_lock: Mutex<()>,
}

impl FileMemoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn logs_path(&self) -> PathBuf {
        self.dir.join(LOGS_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn append_log_line(&self, line: &str) -> Result<(), AgentError> {
        let _guard = self.append_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.logs_path())
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_log_lines(&self) -> Result<Vec<String>, AgentError> {
        match fs::read_to_string(self.logs_path()).await {
            Ok(s) => Ok(s.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_summary(&self) -> Result<Option<String>, AgentError> {
        match fs::read_to_string(self.summary_path()).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_summary(&self, content: &str) -> Result<(), AgentError> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", SUMMARY_FILE, uuid::Uuid::new_v4()));
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, self.summary_path()).await?;
        Ok(())
    }
}

/// 内存存储（测试用）
#[derive(Debug, Default)]
pub struct InMemoryStore {
    lines: std::sync::Mutex<Vec<String>>,
    summary: std::sync::Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置日志行（测试构造历史）
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        *guard(&store.lines) = lines.into_iter().map(Into::into).collect();
        store
    }

    pub fn lines(&self) -> Vec<String> {
        guard(&self.lines).clone()
    }

    pub fn summary(&self) -> Option<String> {
        guard(&self.summary).clone()
    }
}

fn guard<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn append_log_line(&self, line: &str) -> Result<(), AgentError> {
        guard(&self.lines).push(line.to_string());
        Ok(())
    }

    async fn read_log_lines(&self) -> Result<Vec<String>, AgentError> {
        Ok(self.lines())
    }

    async fn read_summary(&self) -> Result<Option<String>, AgentError> {
        Ok(self.summary())
    }

    async fn replace_summary(&self, content: &str) -> Result<(), AgentError> {
        *guard(&self.summary) = Some(content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileMemoryStore::new(dir.path().join(".memory"));
        assert!(store.read_log_lines().await.unwrap().is_empty());
        assert!(store.read_summary().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let store = FileMemoryStore::new(dir.path().join(".memory"));
        store.append_log_line(r#"{"n":1}"#).await.unwrap();
        store.append_log_line(r#"{"n":2}"#).await.unwrap();

        let lines = store.read_log_lines().await.unwrap();
        assert_eq!(lines, vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[tokio::test]
    async fn test_file_store_replace_summary_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileMemoryStore::new(dir.path());
        store.replace_summary("first").await.unwrap();
        store.replace_summary("second").await.unwrap();
        assert_eq!(store.read_summary().await.unwrap().as_deref(), Some("second"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_concurrent_appends_never_interleave() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileMemoryStore::new(dir.path()));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_log_line(&format!(r#"{{"n":{},"pad":"{}"}}"#, i, "x".repeat(256)))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let lines = store.read_log_lines().await.unwrap();
        assert_eq!(lines.len(), 16);
        for line in lines {
            assert!(serde_json::from_str::<serde_json::Value>(&line).is_ok());
        }
    }
}

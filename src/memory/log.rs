//! 记忆日志：每轮对话压缩为一条 LogEntry，追加写入 logs.jsonl
//!
//! - append：一次补全调用抽取 {summary, important_facts, feedback}，解析失败时降级，不报错
//! - grep：从新到旧按正则匹配原始行，无法解析的行以 {"raw": ...} 返回

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{ask, CompletionGateway};
use crate::memory::{parse_json_reply, truncate_chars, ChatMessage, MemoryStore};

/// 解析失败时 summary 保留的原文字符数
pub const DEFAULT_COMPRESS_FALLBACK_CHARS: usize = 200;

const COMPRESS_PROMPT: &str = "Analyze the given conversation messages and summarize them as a single line of JSON. \
Format: {\"summary\": \"short description of what was talked about (about 200 characters)\", \
\"important_facts\": [\"important facts that can be read from the conversation (about 50 characters each)\"], \
\"feedback\": \"insights about the user's preferences and tendencies (about 200 characters)\"} \
Output only the JSON, with no extra explanation.";

/// 单轮对话的压缩记录；写入后不可变
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "datetime", alias = "timestamp", default)]
    pub timestamp: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub important_facts: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

/// 压缩调用期望的返回结构
#[derive(Debug, Deserialize)]
struct CompressedTurn {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    important_facts: Vec<String>,
    #[serde(default)]
    feedback: String,
}

/// grep 命中：按原样解码的日志行（保留全部字段），或无法解析的原始行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GrepHit {
    Stored(Value),
    Raw { raw: String },
}

/// 只追加的记忆日志
pub struct MemoryLog {
    store: Arc<dyn MemoryStore>,
    gateway: Arc<dyn CompletionGateway>,
    fallback_chars: usize,
}

impl MemoryLog {
    pub fn new(store: Arc<dyn MemoryStore>, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            store,
            gateway,
            fallback_chars: DEFAULT_COMPRESS_FALLBACK_CHARS,
        }
    }

    pub fn with_fallback_chars(mut self, chars: usize) -> Self {
        self.fallback_chars = chars;
        self
    }

    /// 压缩本轮消息并追加一行；LLM 调用或存储失败时返回错误，解析失败不报错
    pub async fn append(&self, messages: &[ChatMessage], model: &str) -> Result<LogEntry, AgentError> {
        let transcript = messages
            .iter()
            .map(|m| format!("role: {}\ncontent: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let raw = ask(self.gateway.as_ref(), model, COMPRESS_PROMPT, &transcript).await?;
        let entry = self.parse_entry(&raw);

        let line = serde_json::to_string(&entry).map_err(|e| AgentError::Storage(e.to_string()))?;
        self.store.append_log_line(&line).await?;
        tracing::debug!(summary = %entry.summary, "memory log appended");
        Ok(entry)
    }

    fn parse_entry(&self, raw: &str) -> LogEntry {
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        match parse_json_reply::<CompressedTurn>(raw) {
            Some(c) => LogEntry {
                timestamp,
                summary: c.summary,
                important_facts: c.important_facts,
                feedback: c.feedback,
            },
            None => {
                tracing::warn!("memory compression reply is not valid JSON, keeping raw text");
                LogEntry {
                    timestamp,
                    summary: truncate_chars(raw, self.fallback_chars),
                    important_facts: Vec::new(),
                    feedback: String::new(),
                }
            }
        }
    }

    /// 从新到旧返回最多 limit 条匹配 pattern（正则）的日志
    pub async fn grep(&self, pattern: &str, limit: usize) -> Result<Vec<GrepHit>, AgentError> {
        let re = Regex::new(pattern).map_err(|e| AgentError::InvalidPattern(e.to_string()))?;
        let lines = self.store.read_log_lines().await?;

        let hits = lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && re.is_match(l))
            .take(limit)
            .map(|l| match serde_json::from_str::<Value>(l) {
                Ok(value) => GrepHit::Stored(value),
                Err(_) => GrepHit::Raw { raw: l.to_string() },
            })
            .collect();
        Ok(hits)
    }

    /// 最近 n 条非空日志行（按时间顺序）
    pub async fn recent_lines(&self, n: usize) -> Result<Vec<String>, AgentError> {
        let lines: Vec<String> = self
            .store
            .read_log_lines()
            .await?
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }
}

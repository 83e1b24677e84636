//! 滚动摘要：由最近 W 条日志 + 上一版摘要重新生成，整体替换 summary.json
//!
//! 最新写入者获胜；窗口之外的事实只能通过上一版摘要延续（见 [memory].summary_window）。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::llm::{ask, CompletionGateway};
use crate::memory::{parse_json_reply, truncate_chars, MemoryLog, MemoryStore};

/// 默认参与再生成的最近日志条数
pub const DEFAULT_SUMMARY_WINDOW: usize = 100;
/// 解析失败时 recent_conversation 保留的原文字符数
pub const DEFAULT_SUMMARY_FALLBACK_CHARS: usize = 500;

const NO_PREVIOUS_SUMMARY: &str = "(none)";

/// 单一的最新长期上下文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingSummary {
    #[serde(default)]
    pub recent_conversation: String,
    #[serde(default)]
    pub user_preferences: Map<String, Value>,
}

impl RollingSummary {
    pub fn is_empty(&self) -> bool {
        self.recent_conversation.trim().is_empty() && self.user_preferences.is_empty()
    }
}

fn summary_prompt(previous: &str) -> String {
    format!(
        r#"The following is a log of past conversations between the user and you.
Keep only the information that will be useful in future conversations and output it in the JSON format below. Output only the JSON, with no explanation and no code block.

{{
  "recent_conversation": "short description of what happened in the recent conversations",
  "user_preferences": {{
    "hobbies": ["list of hobbies and interests"],
    "conversation_style": "characteristics of the user's conversation style",
    "(anything as you like)": "freely add insights about the user's preferences and tendencies"
  }}
}}

The purpose is to understand past conversations so that the user's preferences and tendencies can be used from the next conversation on.
---
Prior information: the most recent summary is:
{previous}"#
    )
}

/// 滚动摘要再生成器
pub struct SummaryRegenerator {
    store: Arc<dyn MemoryStore>,
    log: Arc<MemoryLog>,
    gateway: Arc<dyn CompletionGateway>,
    window: usize,
    fallback_chars: usize,
}

impl SummaryRegenerator {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        log: Arc<MemoryLog>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        Self {
            store,
            log,
            gateway,
            window: DEFAULT_SUMMARY_WINDOW,
            fallback_chars: DEFAULT_SUMMARY_FALLBACK_CHARS,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_fallback_chars(mut self, chars: usize) -> Self {
        self.fallback_chars = chars;
        self
    }

    /// 读取当前摘要；不存在或无法解析时返回 None
    pub async fn current(&self) -> Result<Option<RollingSummary>, AgentError> {
        let raw = self.store.read_summary().await?;
        Ok(raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(error = %e, "summary.json is not valid, ignoring");
                None
            }
        }))
    }

    /// 整体替换摘要
    pub async fn write(&self, summary: &RollingSummary) -> Result<(), AgentError> {
        let content =
            serde_json::to_string_pretty(summary).map_err(|e| AgentError::Storage(e.to_string()))?;
        self.store.replace_summary(&content).await
    }

    /// 由最近 window 条日志重新生成摘要；日志为空时返回空摘要且不调用 LLM、不写入
    pub async fn refresh(&self, model: &str) -> Result<RollingSummary, AgentError> {
        let recent = self.log.recent_lines(self.window).await?;
        if recent.is_empty() {
            tracing::debug!("memory log is empty, skipping summary refresh");
            return Ok(RollingSummary::default());
        }

        let previous = match self.current().await? {
            Some(s) if !s.is_empty() => {
                serde_json::to_string(&s).map_err(|e| AgentError::Storage(e.to_string()))?
            }
            _ => NO_PREVIOUS_SUMMARY.to_string(),
        };

        let raw = ask(
            self.gateway.as_ref(),
            model,
            &summary_prompt(&previous),
            &recent.join("\n"),
        )
        .await?;

        let summary = parse_json_reply::<RollingSummary>(&raw).unwrap_or_else(|| {
            tracing::warn!("summary reply is not valid JSON, keeping raw text");
            RollingSummary {
                recent_conversation: truncate_chars(&raw, self.fallback_chars),
                user_preferences: Map::new(),
            }
        });

        self.write(&summary).await?;
        Ok(summary)
    }
}

//! 记忆流水线：记录一轮 = 压缩追加日志 + 再生成滚动摘要
//!
//! 每记录一轮都付出一次摘要再生成的代价，摘要最多落后一轮。

use std::sync::Arc;

use serde::Serialize;

use crate::config::MemorySection;
use crate::core::AgentError;
use crate::llm::CompletionGateway;
use crate::memory::{
    ChatMessage, GrepHit, MemoryLog, MemoryStore, RollingSummary, SummaryRegenerator,
};

/// record_turn 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    pub summary: String,
    pub important_facts: Vec<String>,
    pub feedback: String,
    pub rolling_summary: RollingSummary,
}

/// 记忆门面：持有 MemoryLog 与 SummaryRegenerator，二者共享同一个 MemoryStore
pub struct Memory {
    log: Arc<MemoryLog>,
    regenerator: SummaryRegenerator,
}

impl Memory {
    pub fn new(store: Arc<dyn MemoryStore>, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self::with_settings(store, gateway, &MemorySection::default())
    }

    pub fn with_settings(
        store: Arc<dyn MemoryStore>,
        gateway: Arc<dyn CompletionGateway>,
        settings: &MemorySection,
    ) -> Self {
        let log = Arc::new(
            MemoryLog::new(store.clone(), gateway.clone())
                .with_fallback_chars(settings.compress_fallback_chars),
        );
        let regenerator = SummaryRegenerator::new(store, log.clone(), gateway)
            .with_window(settings.summary_window)
            .with_fallback_chars(settings.summary_fallback_chars);
        Self { log, regenerator }
    }

    pub fn log(&self) -> Arc<MemoryLog> {
        self.log.clone()
    }

    pub fn regenerator(&self) -> &SummaryRegenerator {
        &self.regenerator
    }

    /// 当前滚动摘要（供 PromptAssembler 注入）
    pub async fn summary(&self) -> Result<Option<RollingSummary>, AgentError> {
        self.regenerator.current().await
    }

    pub async fn grep(&self, pattern: &str, limit: usize) -> Result<Vec<GrepHit>, AgentError> {
        self.log.grep(pattern, limit).await
    }

    /// 记录一轮：messages 非空时先追加日志，随后总是刷新摘要
    pub async fn record_turn(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<TurnRecord, AgentError> {
        let entry = if messages.is_empty() {
            tracing::info!("messages is empty, skipping log append and refreshing summary only");
            None
        } else {
            Some(self.log.append(messages, model).await?)
        };

        let rolling_summary = self.regenerator.refresh(model).await?;

        let record = match entry {
            Some(e) => TurnRecord {
                summary: e.summary,
                important_facts: e.important_facts,
                feedback: e.feedback,
                rolling_summary,
            },
            None => TurnRecord {
                rolling_summary,
                ..TurnRecord::default()
            },
        };
        Ok(record)
    }
}

/// 渲染为注入 prompt 的文本：固定标题 + 缩进 JSON
pub fn render_summary(summary: &RollingSummary) -> String {
    let body = serde_json::to_string_pretty(summary)
        .unwrap_or_else(|_| summary.recent_conversation.clone());
    format!(
        "The following is a summary of your past conversations with the user:\n{}",
        body
    )
}

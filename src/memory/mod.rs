//! 记忆层：对话消息、只追加的记忆日志、滚动摘要与存储

pub mod conversation;
pub mod log;
pub mod pipeline;
pub mod store;
pub mod summary;

pub use conversation::{ChatMessage, Message, Role};
pub use log::{GrepHit, LogEntry, MemoryLog};
pub use pipeline::{render_summary, Memory, TurnRecord};
pub use store::{FileMemoryStore, InMemoryStore, MemoryStore};
pub use summary::{RollingSummary, SummaryRegenerator};

use serde::de::DeserializeOwned;

/// 解析 LLM 返回的 JSON；容忍首尾的 ``` 代码块包裹，失败返回 None
pub(crate) fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };
    serde_json::from_str(body).ok()
}

/// 按字符（而非字节）截断
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("こんにちは世界", 5), "こんにちは");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_parse_json_reply_strips_fence() {
        let v: Option<serde_json::Value> = parse_json_reply("```json\n{\"a\":1}\n```");
        assert_eq!(v, Some(serde_json::json!({"a": 1})));
        let v: Option<serde_json::Value> = parse_json_reply("not json");
        assert!(v.is_none());
    }
}

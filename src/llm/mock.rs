//! Mock 补全网关（用于测试，无需 API）
//!
//! 按脚本依次返回预设结果；脚本耗尽后重复最后一条。记录每次 sample 收到的会话快照。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ChatSession, Completion, CompletionGateway, LlmError, ToolCallRequest};

/// Mock 网关：脚本化回复 + 调用计数
#[derive(Debug, Default)]
pub struct MockGateway {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    last: Mutex<Option<Result<Completion, LlmError>>>,
    calls: Mutex<Vec<ChatSession>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次都返回同一段纯文本
    pub fn replying(text: &str) -> Self {
        Self::new().then_reply(text)
    }

    /// 每次都请求同一个工具（arguments 为原始 JSON 文本）
    pub fn always_calling(tool: &str, arguments: &str) -> Self {
        Self::new().then_call(tool, arguments)
    }

    pub fn then_reply(self, text: &str) -> Self {
        self.then(Ok(Completion::text(text)))
    }

    pub fn then_call(self, tool: &str, arguments: &str) -> Self {
        let id = format!("call_{}", self.script_len());
        self.then(Ok(Completion::with_tool_calls(
            "",
            vec![ToolCallRequest::new(id, tool, arguments)],
        )))
    }

    pub fn then_fail(self, err: LlmError) -> Self {
        self.then(Err(err))
    }

    pub fn then(self, result: Result<Completion, LlmError>) -> Self {
        lock(&self.script).push_back(result);
        self
    }

    /// sample 被调用的次数
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// 每次 sample 收到的会话快照（按调用顺序）
    pub fn sessions(&self) -> Vec<ChatSession> {
        lock(&self.calls).clone()
    }

    fn script_len(&self) -> usize {
        lock(&self.script).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn sample(&self, session: &ChatSession) -> Result<Completion, LlmError> {
        lock(&self.calls).push(session.clone());
        let next = lock(&self.script).pop_front();
        match next {
            Some(result) => {
                *lock(&self.last) = Some(result.clone());
                result
            }
            None => lock(&self.last)
                .clone()
                .unwrap_or_else(|| Ok(Completion::text(""))),
        }
    }
}

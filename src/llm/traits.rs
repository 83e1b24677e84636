//! 补全网关抽象
//!
//! 一次 chat-completion 调用：给定模型、工具 schema 与有序消息，返回文本与零或多个工具调用请求。
//! ChatSession 即「会话句柄」：create = ChatSession::new，append = ChatSession::append，
//! sample = CompletionGateway::sample。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::Message;
use crate::tools::ToolSpec;

/// 补全服务调用错误；is_transient 的才由 RetryShell 整轮重试
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("empty response")]
    EmptyResponse,
}

impl LlmError {
    /// 传输层故障、5xx、408、429 可重试；其余 4xx（鉴权失败、请求非法）重试也不会成功
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            LlmError::Request(_) | LlmError::Decode(_) | LlmError::EmptyResponse => true,
        }
    }
}

/// 模型发起的一次工具调用；arguments 为原始 JSON 文本（可能非法，由编排器兜底）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// 一次采样结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Completion {
    /// 纯文本回复
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// 带工具调用的回复
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }
}

/// 单轮会话：模型、工具 schema 与只追加的消息序列；由一轮独占，轮次结束即丢弃
#[derive(Debug, Clone)]
pub struct ChatSession {
    model: String,
    tools: Vec<ToolSpec>,
    tools_enabled: bool,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, tools: Vec<ToolSpec>) -> Self {
        Self {
            model: model.into(),
            tools,
            tools_enabled: true,
            messages: Vec::new(),
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// 为 false 时网关必须禁止模型再发起工具调用（强制最终回答）
    pub fn tools_enabled(&self) -> bool {
        self.tools_enabled && !self.tools.is_empty()
    }

    pub fn disable_tools(&mut self) {
        self.tools_enabled = false;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// 补全网关 trait：所有后端（OpenAI 兼容 / Mock）实现 sample
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn sample(&self, session: &ChatSession) -> Result<Completion, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 单次问答：system + user 两条消息、无工具（记忆压缩与摘要再生使用）
pub async fn ask(
    gateway: &dyn CompletionGateway,
    model: &str,
    system_prompt: &str,
    user_message: &str,
) -> Result<String, LlmError> {
    let mut session = ChatSession::new(model, Vec::new());
    session.append(Message::system(system_prompt));
    session.append(Message::user(user_message));
    let completion = gateway.sample(&session).await?;
    Ok(completion.content)
}

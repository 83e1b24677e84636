//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定整轮重试（Retry）或立即终止（Abort）。

use thiserror::Error;

use crate::llm::LlmError;

/// 一轮对话 / 记忆处理过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 缺少凭据或配置错误：致命，不重试
    #[error("Config error: {0}")]
    Config(String),

    /// 调用方请求不合法（如 messages 为空）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 记忆存储读写失败（logs.jsonl / summary.json）
    #[error("Storage error: {0}")]
    Storage(String),

    /// 模型请求了未注册的工具：终止整轮
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// 后台任务在返回结果前被丢弃（panic 或运行时关闭）
    #[error("Background task dropped: {0}")]
    TaskDropped(String),
}

impl AgentError {
    /// 传输类错误（暂时性的 LLM 故障、构建会话时的存储读取）可整轮重试；其余均为致命错误
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Llm(e) => e.is_transient(),
            AgentError::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Storage(e.to_string())
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 立即重跑整轮（无退避）
    Retry,
    /// 终止当前轮次并上抛错误
    Abort,
}

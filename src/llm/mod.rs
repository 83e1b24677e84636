//! LLM 层：补全网关抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockGateway;
pub use openai::{OpenAiGateway, TokenUsage};
pub use traits::{ask, ChatSession, Completion, CompletionGateway, LlmError, ToolCallRequest};
